use serde::{Deserialize, Serialize};

/// The lexer sub-states the tree builder can switch the tokenizer into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// 13.2.5.1 Data state
    Data,

    /// 13.2.5.2 RCDATA state
    RcData,

    /// 13.2.5.3 RAWTEXT state
    RawText,

    /// 13.2.5.4 Script data state
    ScriptData,

    /// 13.2.5.5 PLAINTEXT state
    PlainText,
}
