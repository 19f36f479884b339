//! Closed vocabularies persisted as text columns.
//!
//! Each enum round-trips through the exact wire/database spelling, so JSON
//! payloads, query strings and stored rows all share one representation.

use std::{fmt, str::FromStr};

use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, diesel::AsExpression, diesel::FromSqlRow)]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: value.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|variant| variant.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.trim().parse().map_err(de::Error::custom)
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let value = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(value.parse()?)
            }
        }
    };
}

text_enum! {
    /// Account role. Every authorization decision matches on this exhaustively.
    Role ("role") {
        Seeker => "seeker",
        Recruiter => "recruiter",
        Admin => "admin",
    }
}

text_enum! {
    JobType ("job type") {
        FullTime => "Full-Time",
        PartTime => "Part-Time",
        Internship => "Internship",
        Freelance => "Freelance",
    }
}

text_enum! {
    JobCategory ("category") {
        It => "IT",
        Finance => "Finance",
        Healthcare => "Healthcare",
        Networking => "Networking",
        Other => "Other",
    }
}

text_enum! {
    /// Admin-facing visibility flag of a posting.
    JobStatus ("job status") {
        Active => "active",
        Inactive => "inactive",
    }
}

text_enum! {
    /// Review state of an application. Accepted and Rejected are terminal.
    ApplicationStatus ("application status") {
        UnderReview => "Under Review",
        Accepted => "Accepted",
        Rejected => "Rejected",
    }
}

impl Role {
    /// Roles that may be chosen at self-registration.
    pub fn is_self_registrable(self) -> bool {
        match self {
            Role::Seeker | Role::Recruiter => true,
            Role::Admin => false,
        }
    }
}

impl Default for JobType {
    fn default() -> Self {
        JobType::FullTime
    }
}

impl Default for JobCategory {
    fn default() -> Self {
        JobCategory::Other
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Active
    }
}

impl JobStatus {
    pub fn toggled(self) -> Self {
        match self {
            JobStatus::Active => JobStatus::Inactive,
            JobStatus::Inactive => JobStatus::Active,
        }
    }
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        ApplicationStatus::UnderReview
    }
}
