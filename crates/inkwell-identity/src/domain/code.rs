//! Code generation and the bypass policy.

use inkwell_core::rng::DeterministicRng;

/// Number of digits in a generated code.
pub const CODE_LENGTH: usize = 6;

const CODE_MAX: u32 = 999_999;

/// Verification settings injected into the engine at construction.
///
/// `master_code` switches the engine into bypass mode: every issued code is
/// the master value, dispatch is skipped, and verification accepts the
/// master value for any identifier without consulting storage. It exists for
/// controlled non-production environments only.
#[derive(Debug, Clone, Default)]
pub struct VerificationPolicy {
    master_code: Option<String>,
}

impl VerificationPolicy {
    /// Creates a policy. Blank master codes are treated as absent.
    #[must_use]
    pub fn new(master_code: Option<String>) -> Self {
        let master_code = master_code
            .map(|code| code.trim().to_owned())
            .filter(|code| !code.is_empty());
        Self { master_code }
    }

    /// Returns the configured master code, if any.
    #[must_use]
    pub fn master_code(&self) -> Option<&str> {
        self.master_code.as_deref()
    }

    /// Returns `true` when a master code is configured.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.master_code.is_some()
    }

    /// Produces the code for a new record.
    pub fn generate_code(&self, rng: &mut dyn DeterministicRng) -> String {
        match &self.master_code {
            Some(master) => master.clone(),
            None => random_code(rng),
        }
    }
}

/// Draws a uniformly random, zero-padded six digit code.
pub fn random_code(rng: &mut dyn DeterministicRng) -> String {
    let value = rng.next_u32_range(0, CODE_MAX);
    format!("{value:0width$}", width = CODE_LENGTH)
}
