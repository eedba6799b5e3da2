use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// LCD indicators outside the four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbol {
    Auto,
    Dc,
    Ac,
    Rel,
    Beep,
    Battery,
    Loz,
    #[serde(rename = "BMINUS")]
    BMinus,
    Hold,
    Dbm,
    Mega,
    Kilo,
    Crest,
    Ohm,
    Hz,
    Nano,
    Max,
    Farad,
    Micro,
    Milli,
    Min,
    Volt,
    Ampere,
    Scale,
}

pub type SymbolSet = BTreeSet<Symbol>;

/// Frame byte index and its four symbols, bit 3 first.
pub(crate) const SYMBOL_TABLE: [(usize, [Symbol; 4]); 6] = [
    (1, [Symbol::Auto, Symbol::Dc, Symbol::Ac, Symbol::Rel]),
    (2, [Symbol::Beep, Symbol::Battery, Symbol::Loz, Symbol::BMinus]),
    (11, [Symbol::Hold, Symbol::Dbm, Symbol::Mega, Symbol::Kilo]),
    (12, [Symbol::Crest, Symbol::Ohm, Symbol::Hz, Symbol::Nano]),
    (13, [Symbol::Max, Symbol::Farad, Symbol::Micro, Symbol::Milli]),
    (14, [Symbol::Min, Symbol::Volt, Symbol::Ampere, Symbol::Scale]),
];

pub(crate) fn extract_symbols(raw: &[u8]) -> SymbolSet {
    let mut symbols = SymbolSet::new();
    for (index, entries) in SYMBOL_TABLE.iter() {
        let byte = raw[*index];
        for (slot, symbol) in entries.iter().enumerate() {
            if byte & (0b1000 >> slot) != 0 {
                symbols.insert(*symbol);
            }
        }
    }
    symbols
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Auto => "AUTO",
            Symbol::Dc => "DC",
            Symbol::Ac => "AC",
            Symbol::Rel => "REL",
            Symbol::Beep => "BEEP",
            Symbol::Battery => "BATTERY",
            Symbol::Loz => "LOZ",
            Symbol::BMinus => "BMINUS",
            Symbol::Hold => "HOLD",
            Symbol::Dbm => "DBM",
            Symbol::Mega => "MEGA",
            Symbol::Kilo => "KILO",
            Symbol::Crest => "CREST",
            Symbol::Ohm => "OHM",
            Symbol::Hz => "HZ",
            Symbol::Nano => "NANO",
            Symbol::Max => "MAX",
            Symbol::Farad => "FARAD",
            Symbol::Micro => "MICRO",
            Symbol::Milli => "MILLI",
            Symbol::Min => "MIN",
            Symbol::Volt => "VOLT",
            Symbol::Ampere => "AMPERE",
            Symbol::Scale => "SCALE",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
