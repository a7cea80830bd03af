use serde::{Deserialize, Serialize};

/// Storage key of a tradable instrument.
pub type InstrumentId = i64;

/// A member of the instrument universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub symbol: String,
    pub name: Option<String>,
    pub is_active: bool,
}
