//! Gross profit split between beneficiaries
//!
//! Configured as `name:bps,name:bps` (basis points, summing to 10000).

use serde::{Deserialize, Serialize};

pub const TOTAL_BPS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub name: String,
    pub bps: u32,
}

/// Parse `owner:7000,partner:3000`
pub fn parse_split(raw: &str) -> Result<Vec<Beneficiary>, String> {
    let mut beneficiaries: Vec<Beneficiary> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, bps) = part
            .split_once(':')
            .ok_or_else(|| format!("invalid profit split entry '{part}', expected name:bps"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty beneficiary name in '{part}'"));
        }
        if beneficiaries.iter().any(|b| b.name == name) {
            return Err(format!("duplicate beneficiary '{name}'"));
        }
        let bps: u32 = bps
            .trim()
            .parse()
            .map_err(|_| format!("invalid basis points in '{part}'"))?;
        beneficiaries.push(Beneficiary {
            name: name.to_string(),
            bps,
        });
    }

    if beneficiaries.is_empty() {
        return Err("profit split needs at least one beneficiary".into());
    }
    let total: u64 = beneficiaries.iter().map(|b| u64::from(b.bps)).sum();
    if total != u64::from(TOTAL_BPS) {
        return Err(format!("profit split must total {TOTAL_BPS} bps, got {total}"));
    }
    Ok(beneficiaries)
}

/// Split `gross_cents` by basis points
///
/// Each share is truncated; the remainder goes to the first beneficiary so
/// the shares always sum to `gross_cents`.
pub fn split_profit(gross_cents: i64, beneficiaries: &[Beneficiary]) -> Vec<(String, i64)> {
    let mut shares: Vec<(String, i64)> = beneficiaries
        .iter()
        .map(|b| {
            let amount = i128::from(gross_cents) * i128::from(b.bps) / i128::from(TOTAL_BPS);
            // bps <= TOTAL_BPS, so |amount| <= |gross_cents| fits in i64
            (b.name.clone(), amount as i64)
        })
        .collect();

    let allocated: i64 = shares.iter().map(|(_, a)| a).sum();
    if let Some(first) = shares.first_mut() {
        first.1 += gross_cents - allocated;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_split() {
        let split = parse_split("owner:7000, partner:3000").unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[1], Beneficiary { name: "partner".into(), bps: 3000 });
    }

    #[test]
    fn parse_rejects_bad_totals_and_duplicates() {
        assert!(parse_split("owner:9000").is_err());
        assert!(parse_split("a:5000,a:5000").is_err());
        assert!(parse_split("owner").is_err());
        assert!(parse_split("").is_err());
    }

    #[test]
    fn parse_rejects_totals_that_wrap_u32() {
        let err = parse_split("a:4294967295,b:10001").unwrap_err();
        assert!(err.contains("must total"), "{err}");
        assert!(parse_split("a:4294967295,b:1").is_err());
    }

    #[test]
    fn remainder_goes_to_first() {
        let split = parse_split("a:3333,b:3333,c:3334").unwrap();
        let shares = split_profit(100, &split);
        assert_eq!(shares, vec![("a".into(), 34), ("b".into(), 33), ("c".into(), 33)]);
        assert_eq!(shares.iter().map(|(_, a)| a).sum::<i64>(), 100);
    }

    #[test]
    fn negative_profit_still_sums() {
        let split = parse_split("a:5000,b:5000").unwrap();
        let shares = split_profit(-101, &split);
        assert_eq!(shares.iter().map(|(_, a)| a).sum::<i64>(), -101);
    }
}
