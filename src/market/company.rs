use serde::{Deserialize, Serialize};
use std::fmt;

use crate::random::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Technology,
    OilAndGas,
    BanksAndFinance,
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Industry::Technology => "Technology",
            Industry::OilAndGas => "Oil & Gas",
            Industry::BanksAndFinance => "Banks & Finance",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Company {
    pub symbol: &'static str,
    pub name: &'static str,
    pub industry: Industry,
}

impl Company {
    const fn new(symbol: &'static str, name: &'static str, industry: Industry) -> Self {
        Self { symbol, name, industry }
    }
}

/// Every listable company, in catalog order.
pub const ROSTER: [Company; 11] = [
    Company::new("AAPN", "Pineapple, Inc.", Industry::Technology),
    Company::new("GOOF", "Goofle LLC", Industry::Technology),
    Company::new("MIFT", "Minisoft Corporation", Industry::Technology),
    Company::new("INDC", "Indell Corporation", Industry::Technology),
    Company::new("RFST", "Rainforest.com, Inc.", Industry::Technology),
    Company::new("ZON", "Ezon Moboil Corporation", Industry::OilAndGas),
    Company::new("PETL", "Petrosil S.A.", Industry::OilAndGas),
    Company::new("CVO", "Chevroom Corporation", Industry::OilAndGas),
    Company::new("JPMO", "JPMoney Chase & Co.", Industry::BanksAndFinance),
    Company::new("T", "Towngroup, Inc.", Industry::BanksAndFinance),
    Company::new("GSA", "Golden Sax Group, Inc.", Industry::BanksAndFinance),
];

/// Orders the roster by one random key per company. Deterministic for a seeded source.
pub fn shuffled_roster(rng: &dyn RandomSource) -> Vec<Company> {
    let mut keyed: Vec<(u64, Company)> = ROSTER
        .iter()
        .cloned()
        .map(|company| (rng.next_u64(), company))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, company)| company).collect()
}
