//! Classification of chat input: text commands and control tokens

use crate::builds::Variant;

/// Token carried by the checksum control; activating it only acknowledges
pub const CHECKSUM_TOKEN: &str = "md5_copy";

/// A recognized text command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Devices,
    /// `/axion <codename>`, codename lower-cased when present
    Axion(Option<String>),
}

impl Command {
    /// Parse a chat message
    ///
    /// The first whitespace-separated token selects the command; it is
    /// matched case-insensitively with any `@botname` suffix removed.
    /// Returns `None` for plain text and unknown commands.
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next()?.to_lowercase();
        let command = first.split_once('@').map_or(first.as_str(), |(cmd, _)| cmd);

        match command {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/devices" => Some(Self::Devices),
            "/axion" => Some(Self::Axion(tokens.next().map(str::to_lowercase))),
            _ => None,
        }
    }
}

/// A navigation control activation, decoded from its `action_codename` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Return to the summary view of a device
    Back { codename: String },
    /// Open the detail view; `action` names the variant and may not be a known one
    Details { action: String, codename: String },
    /// The checksum control
    ChecksumCopied,
}

impl CallbackAction {
    pub fn back(codename: &str) -> Self {
        Self::Back {
            codename: codename.to_string(),
        }
    }

    pub fn details(variant: Variant, codename: &str) -> Self {
        Self::Details {
            action: variant.token().to_string(),
            codename: codename.to_string(),
        }
    }

    /// Decode a token. Splits once at the first `_`, so codenames may contain
    /// underscores. Tokens without a separator are not navigation controls.
    pub fn parse(data: &str) -> Option<Self> {
        if data == CHECKSUM_TOKEN {
            return Some(Self::ChecksumCopied);
        }

        let (action, codename) = data.split_once('_')?;
        if codename.is_empty() {
            return None;
        }

        if action == "back" {
            Some(Self::Back {
                codename: codename.to_string(),
            })
        } else {
            Some(Self::Details {
                action: action.to_string(),
                codename: codename.to_string(),
            })
        }
    }

    /// Encode back into the token carried by a control
    pub fn token(&self) -> String {
        match self {
            Self::Back { codename } => format!("back_{}", codename),
            Self::Details { action, codename } => format!("{}_{}", action, codename),
            Self::ChecksumCopied => CHECKSUM_TOKEN.to_string(),
        }
    }
}
