use std::collections::HashMap;

/// Gate in front of the data: only authenticated users get a session.
pub trait Authenticator {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Plain text username to password map. Demo use only.
#[derive(Debug, Default, Clone)]
pub struct FixedCredentials {
    users: HashMap<String, String>,
}

impl FixedCredentials {
    pub fn new<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: users
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    pub fn demo() -> Self {
        Self::new([
            ("police", "12345"),
            ("admin", "admin123"),
            ("clerk", "clerk123"),
        ])
    }
}

impl Authenticator for FixedCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_users() {
        let auth = FixedCredentials::demo();
        assert!(auth.authenticate("police", "12345"));
        assert!(auth.authenticate("admin", "admin123"));
        assert!(auth.authenticate("clerk", "clerk123"));
    }

    #[test]
    fn rejects_wrong_credentials() {
        let auth = FixedCredentials::demo();
        assert!(!auth.authenticate("police", "admin123"));
        assert!(!auth.authenticate("Police", "12345"));
        assert!(!auth.authenticate("nobody", ""));
        assert!(!auth.authenticate("", ""));
    }

    #[test]
    fn custom_users() {
        let auth = FixedCredentials::new(vec![("detective".to_string(), "s3cret".to_string())]);
        assert!(auth.authenticate("detective", "s3cret"));
        assert!(!auth.authenticate("police", "12345"));
    }
}
