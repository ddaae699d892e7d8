//! HTTP clients for external collaborators.

pub mod http;
pub mod matcher;

/// User-Agent sent to every collaborator.
///
/// Format: `rollcall/<version>`
pub fn build_user_agent() -> String {
    format!("rollcall/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_user_agent() {
        let ua = build_user_agent();
        assert_eq!(ua, format!("rollcall/{}", env!("CARGO_PKG_VERSION")));
    }
}
