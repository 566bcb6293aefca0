use std::str::FromStr;

use crate::types::AccessTier;

pub fn check_tier(tier: &str) -> Result<String, String> {
    AccessTier::from_str(tier)?;

    Ok(tier.to_string())
}

pub fn parse_tier(tier: &str) -> Result<AccessTier, String> {
    AccessTier::from_str(tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_tier_test() {
        check_tier("Hot").unwrap();
        check_tier("Cool").unwrap();
        check_tier("Cold").unwrap();
        check_tier("Archive").unwrap();
        check_tier("archive").unwrap();

        assert!(check_tier("").is_err());
        assert!(check_tier("GLACIER").is_err());
    }

    #[test]
    fn parse_tier_test() {
        assert_eq!(parse_tier("cool").unwrap(), AccessTier::Cool);
    }
}
