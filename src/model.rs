use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Category {
    Business,
    Tech,
    Study,
    Investment,
    Personal,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "Business",
            Self::Tech => "Tech",
            Self::Study => "Study",
            Self::Investment => "Investment",
            Self::Personal => "Personal",
            Self::Other => "Other",
        }
    }
}

/// Lifecycle stage of an idea. Variants are declared in lifecycle order, so
/// the derived `Ord` follows the progression.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Status {
    Concept,
    Prototype,
    Testing,
    Implementation,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Concept,
        Status::Prototype,
        Status::Testing,
        Status::Implementation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "Concept",
            Self::Prototype => "Prototype",
            Self::Testing => "Testing",
            Self::Implementation => "Implementation",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|status| status == self)
            .unwrap_or_default()
    }

    /// The following stage, or `None` once an idea reaches implementation.
    pub fn next(&self) -> Option<Status> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub idea_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due > now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub status: Status,
    #[serde(default)]
    pub notes: String,
    pub tasks: Vec<Task>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Idea {
    pub fn completed_tasks(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    /// Share of completed tasks as a rounded percentage; 0 without tasks.
    pub fn progress(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let ratio = self.completed_tasks() as f64 / self.tasks.len() as f64;
        (ratio * 100.0).round() as u8
    }

    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.category.as_str().to_lowercase().contains(&needle)
    }
}

#[derive(Clone, Debug)]
pub struct IdeaInput {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub status: Status,
    pub notes: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TaskFilter {
    #[default]
    All,
    Upcoming,
}

/// Tasks of one idea, as returned by the flattened task listing.
#[derive(Clone, Debug)]
pub struct IdeaTasks {
    pub idea_id: String,
    pub idea_title: String,
    pub tasks: Vec<Task>,
}

/// Current time at the millisecond precision used by the stored format.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub mod timestamp {
    use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let raw = raw.trim();
        match DateTime::parse_from_rfc3339(raw) {
            Ok(value) => Ok(value.with_timezone(&Utc)),
            Err(err) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => date
                    .and_hms_opt(0, 0, 0)
                    .map(|midnight| midnight.and_utc())
                    .ok_or(err),
                Err(_) => Err(err),
            },
        }
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.filter(|value| !value.trim().is_empty())
                .map(|value| super::parse(&value).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
