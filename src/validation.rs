use crate::{errors::ValidationError, models::User};

/// Networks offered as completions for the chain field.
pub const KNOWN_CHAINS: [&str; 20] = [
    "Aptos", "Arbitrum", "Avalanche", "Cardano", "Cosmos", "Polkadot", "Ethereum", "Fantom",
    "Bitcoin", "Binance Chain", "Loopring", "Polygon", "Metis", "Optimism", "Osmosis",
    "Solana", "Sui", "Ton", "Tezos", "zkSync",
];

/// Checks a submission in the order users see the messages.
pub fn validate_submission(user: &User, name: &str, chain: &str) -> Result<(), ValidationError> {
    if user.has_submitted_today() {
        return Err(ValidationError::AlreadySubmittedToday);
    }
    if !name.contains('$') {
        return Err(ValidationError::MissingDollarSign);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::NotSingleWord);
    }
    if chain.trim().is_empty() {
        return Err(ValidationError::EmptyChain);
    }
    Ok(())
}

/// Trims a requested display name, refusing blank ones.
pub fn normalize_username(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    Ok(trimmed)
}

/// Case-insensitive prefix match over [`KNOWN_CHAINS`], keeping list order.
pub fn suggest_chains(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.trim().to_lowercase();
    KNOWN_CHAINS
        .iter()
        .copied()
        .filter(|chain| chain.to_lowercase().starts_with(&prefix))
        .collect()
}
