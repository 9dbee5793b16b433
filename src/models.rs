//! Request and result types shared by the admission pipeline and the generation handler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::middleware::RequestId;

macro_rules! selection_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

selection_enum!(
    /// Subject area of the generated post.
    Topic {
        BehavioralPsychology => "behavioral-psychology",
        LeadershipTrends => "leadership-trends",
        WorkplaceInnovation => "workplace-innovation",
        ManagementInsights => "management-insights",
    }
);

selection_enum!(
    /// Reader group the post is written for.
    Audience {
        MiddleManagers => "middle-managers",
        HrProfessionals => "hr-professionals",
        Executives => "executives",
        Entrepreneurs => "entrepreneurs",
    }
);

selection_enum!(
    /// Requested writing style.
    Style {
        Professional => "professional",
        Casual => "casual",
        ThoughtLeadership => "thought-leadership",
    }
);

/// A request that passed field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: Topic,
    pub audience: Audience,
    pub style: Option<Style>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub topic: Topic,
    pub audience: Audience,
    pub style: Option<Style>,
    #[serde(rename = "optimal_time")]
    pub optimal_time: &'static str,
    pub hashtags: Vec<&'static str>,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    pub request_id: RequestId,
}

/// Generated post plus derived metadata. Built once per successful provider call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub content: String,
    pub metadata: GenerationMetadata,
}

/// Per-request usage sample, attached to the request for logging.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub user_agent: Option<String>,
}
