use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pages are 1-indexed on the backend
pub const FIRST_PAGE: u32 = 1;

/// A profile eligible to be judged by the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub gender: Gender,
    #[serde(deserialize_with = "deserialize_birth_date")]
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl Candidate {
    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut age = today.year() - self.birth_date.year();
        if (today.month(), today.day()) < (self.birth_date.month(), self.birth_date.day()) {
            age -= 1;
        }
        age.max(0) as u32
    }

    pub fn age(&self) -> u32 {
        self.age_on(Local::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

/// Gender marker as sent by the backend ("M" / "F")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    pub fn label(&self) -> &str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other(marker) => marker,
        }
    }
}

impl From<String> for Gender {
    fn from(marker: String) -> Self {
        match marker.as_str() {
            "M" => Gender::Male,
            "F" => Gender::Female,
            _ => Gender::Other(marker),
        }
    }
}

impl From<Gender> for String {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => "M".to_string(),
            Gender::Female => "F".to_string(),
            Gender::Other(marker) => marker,
        }
    }
}

/// A user's answer to a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Accept,
    Reject,
}

impl Response {
    /// Value of the `response` query parameter understood by the backend
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Response::Accept => "like",
            Response::Reject => "unlike",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Accept => write!(f, "accept"),
            Response::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for Response {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" | "like" | "y" | "yes" => Ok(Response::Accept),
            "reject" | "unlike" | "dislike" | "n" | "no" => Ok(Response::Reject),
            other => Err(format!("Unknown response: {other}")),
        }
    }
}

/// Result of submitting a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Both users accepted each other
    Matched,
    NotMatched,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

impl From<bool> for MatchOutcome {
    fn from(is_match: bool) -> Self {
        if is_match {
            MatchOutcome::Matched
        } else {
            MatchOutcome::NotMatched
        }
    }
}

/// Body returned by the decision endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawMatchResponse")]
pub struct MatchResponse {
    pub is_match: bool,
}

/// Older backends send `match`; `is_match` wins when both are present
#[derive(Deserialize)]
struct RawMatchResponse {
    #[serde(default)]
    is_match: Option<bool>,
    #[serde(default, rename = "match")]
    legacy_match: Option<bool>,
}

impl From<RawMatchResponse> for MatchResponse {
    fn from(raw: RawMatchResponse) -> Self {
        Self {
            is_match: raw.is_match.or(raw.legacy_match).unwrap_or(false),
        }
    }
}

/// An established match as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
}

/// One page request against a paginated endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn deserialize_birth_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_birth_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid birth date: {raw}")))
}

/// Accepts plain dates and RFC 3339 timestamps
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    // Timestamps without an offset, e.g. "1998-04-12T00:00:00.000"
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
