//! Persistent records and the inputs used to create or change them

pub mod analytics;
pub mod comment;
pub mod post;
pub mod subscriber;
pub mod user;

pub use analytics::{AnalyticsEvent, DailyCount, EventFilter, NewAnalyticsEvent};
pub use comment::{Comment, CommentChanges, CommentFilter, CommentStatus, NewComment};
pub use post::{AuthorSummary, NewPost, Post, PostChanges, PostFilter, PostStatus};
pub use subscriber::{normalize_email, SubscribeOutcome, Subscriber};
pub use user::{NewUser, User};

/// Implements string conversions for enums stored as TEXT columns
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::ModelError::Validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::ModelError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;
