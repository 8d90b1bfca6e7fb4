//! Turns search response events into [`Tweet`] records.
//!
//! The response is not validated against a schema. What a value means is
//! decided by its nesting depth and container shape alone:
//!
//! | depth | shape  | meaning                 |
//! |-------|--------|-------------------------|
//! | 0     | object | response root           |
//! | 1     | array  | record collection       |
//! | 2     | object | one record              |
//!
//! Anything else (including the per-result `metadata` object) is ignored.

use std::io::Read;

use super::error::ScanError;
use super::events::{drive, DocumentBuilder, Scalar, Shape};

/// Depth of the top-level response object.
pub const ROOT_DEPTH: usize = 0;
/// Depth of the `results` array inside the root object.
pub const COLLECTION_DEPTH: usize = 1;
/// Depth of each record object inside `results`.
pub const RECORD_DEPTH: usize = 2;

const RESULTS_KEY: &str = "results";

/// One search result. Every field is optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: Option<String>,
    pub from_user: Option<String>,
    pub from_user_id: Option<String>,
    pub to_user: Option<String>,
    pub to_user_id: Option<String>,
    pub iso_language_code: Option<String>,
    pub source: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweetField {
    Id,
    Text,
    FromUser,
    FromUserId,
    ToUser,
    ToUserId,
    IsoLanguageCode,
    Source,
    ProfileImageUrl,
    CreatedAt,
}

impl TweetField {
    pub const ALL: [TweetField; 10] = [
        TweetField::Id,
        TweetField::Text,
        TweetField::FromUser,
        TweetField::FromUserId,
        TweetField::ToUser,
        TweetField::ToUserId,
        TweetField::IsoLanguageCode,
        TweetField::Source,
        TweetField::ProfileImageUrl,
        TweetField::CreatedAt,
    ];

    /// Key in the response object, also used as the column name.
    pub fn name(self) -> &'static str {
        match self {
            TweetField::Id => "id",
            TweetField::Text => "text",
            TweetField::FromUser => "from_user",
            TweetField::FromUserId => "from_user_id",
            TweetField::ToUser => "to_user",
            TweetField::ToUserId => "to_user_id",
            TweetField::IsoLanguageCode => "iso_language_code",
            TweetField::Source => "source",
            TweetField::ProfileImageUrl => "profile_image_url",
            TweetField::CreatedAt => "created_at",
        }
    }

    /// Case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl Tweet {
    pub fn get(&self, field: TweetField) -> Option<&str> {
        let value = match field {
            TweetField::Id => &self.id,
            TweetField::Text => &self.text,
            TweetField::FromUser => &self.from_user,
            TweetField::FromUserId => &self.from_user_id,
            TweetField::ToUser => &self.to_user,
            TweetField::ToUserId => &self.to_user_id,
            TweetField::IsoLanguageCode => &self.iso_language_code,
            TweetField::Source => &self.source,
            TweetField::ProfileImageUrl => &self.profile_image_url,
            TweetField::CreatedAt => &self.created_at,
        };
        value.as_deref()
    }

    fn slot(&mut self, field: TweetField) -> &mut Option<String> {
        match field {
            TweetField::Id => &mut self.id,
            TweetField::Text => &mut self.text,
            TweetField::FromUser => &mut self.from_user,
            TweetField::FromUserId => &mut self.from_user_id,
            TweetField::ToUser => &mut self.to_user,
            TweetField::ToUserId => &mut self.to_user_id,
            TweetField::IsoLanguageCode => &mut self.iso_language_code,
            TweetField::Source => &mut self.source,
            TweetField::ProfileImageUrl => &mut self.profile_image_url,
            TweetField::CreatedAt => &mut self.created_at,
        }
    }
}

/// Ordered records with a hard upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetCollection {
    tweets: Vec<Tweet>,
    capacity: usize,
}

impl TweetCollection {
    pub fn new(capacity: usize) -> Self {
        Self {
            tweets: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, tweet: Tweet) -> Result<(), ScanError> {
        if self.tweets.len() >= self.capacity {
            return Err(ScanError::CapacityExceeded {
                limit: self.capacity,
            });
        }
        self.tweets.push(tweet);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Tweet> {
        self.tweets.get(index)
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tweet> {
        self.tweets.iter()
    }
}

/// The response root. `results` stays unset when the member is absent or
/// is not an array.
#[derive(Debug, Default)]
pub struct ResultRoot {
    pub results: Option<TweetCollection>,
}

/// Handle for a value under construction.
#[derive(Debug)]
pub enum Node {
    Root(ResultRoot),
    Collection(TweetCollection),
    Record(Tweet),
    /// A structure with no meaning at its position.
    Ignored,
    Text(String),
}

/// [`DocumentBuilder`] producing a [`ResultRoot`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    capacity: usize,
}

impl RecordBuilder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl DocumentBuilder for RecordBuilder {
    type Node = Node;

    fn begin(&mut self, depth: usize, shape: Shape) -> Node {
        match (depth, shape) {
            (ROOT_DEPTH, Shape::Object) => Node::Root(ResultRoot::default()),
            (COLLECTION_DEPTH, Shape::Array) => {
                Node::Collection(TweetCollection::new(self.capacity))
            }
            (RECORD_DEPTH, Shape::Object) => Node::Record(Tweet::default()),
            _ => Node::Ignored,
        }
    }

    fn scalar(&mut self, value: Scalar<'_>) -> Option<Node> {
        match value {
            Scalar::String(text) | Scalar::Number(text) => Some(Node::Text(text.to_string())),
            Scalar::Bool(_) | Scalar::Null => None,
        }
    }

    fn attach(
        &mut self,
        parent: &mut Node,
        key: Option<&str>,
        value: Option<Node>,
    ) -> Result<(), ScanError> {
        match (parent, key) {
            (Node::Root(root), Some(RESULTS_KEY)) => {
                if let Some(Node::Collection(collection)) = value {
                    root.results = Some(collection);
                }
            }
            (Node::Record(tweet), Some(key)) => {
                if let (Some(field), Some(Node::Text(text))) = (TweetField::from_name(key), value)
                {
                    // empty strings stay null
                    if !text.is_empty() {
                        *tweet.slot(field) = Some(text);
                    }
                }
            }
            (Node::Collection(collection), None) => {
                if let Some(Node::Record(tweet)) = value {
                    collection.push(tweet)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse a search response body into its record collection.
///
/// Returns `Ok(None)` when the root object has no usable `results` member,
/// and [`ScanError::MissingResultRoot`] when the document is not an object.
pub fn read_response<R: Read>(
    reader: R,
    capacity: usize,
) -> Result<Option<TweetCollection>, ScanError> {
    match drive(reader, &mut RecordBuilder::new(capacity))? {
        Some(Node::Root(root)) => Ok(root.results),
        _ => Err(ScanError::MissingResultRoot),
    }
}
