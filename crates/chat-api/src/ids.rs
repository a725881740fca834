use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use super::error::{ChatApiError, ChatApiResult, InvalidIdSnafu};

// Server identifiers are opaque strings; the wrappers only keep them from being mixed up.
macro_rules! define_chat_id {
    ($name:ident, $id_type:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> ChatApiResult<Self> {
                let trimmed = raw.trim();
                ensure!(
                    !trimmed.is_empty(),
                    InvalidIdSnafu {
                        stage: "parse-chat-id",
                        id_type: $id_type,
                        raw: raw.to_string(),
                    }
                );
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ChatApiError;

            fn from_str(raw: &str) -> ChatApiResult<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_chat_id!(SegmentId, "segment-id");
define_chat_id!(SessionId, "session-id");
define_chat_id!(MessageId, "message-id");
define_chat_id!(UserId, "user-id");
