use async_trait::async_trait;
use dashmap::DashMap;
use reverse_repl_domain::{ChangeFeedAdmin, ChangeFeedOptions, PortError, PortResult};

use super::PortProbe;

/// Change feeds keyed by `(database uri, feed name)`.
#[derive(Debug, Default)]
pub struct InMemoryChangeFeedAdmin {
    feeds: DashMap<(String, String), ChangeFeedOptions>,
    probe: PortProbe,
}

fn key(database_uri: &str, name: &str) -> (String, String) {
    (database_uri.to_string(), name.to_string())
}

impl InMemoryChangeFeedAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }

    pub fn insert_feed(&self, database_uri: &str, name: &str, options: ChangeFeedOptions) {
        self.feeds.insert(key(database_uri, name), options);
    }

    pub fn feed(&self, database_uri: &str, name: &str) -> Option<ChangeFeedOptions> {
        self.feeds.get(&key(database_uri, name)).map(|f| f.clone())
    }
}

#[async_trait]
impl ChangeFeedAdmin for InMemoryChangeFeedAdmin {
    async fn feed_exists(&self, database_uri: &str, name: &str) -> PortResult<bool> {
        self.probe.enter("feed_exists")?;
        Ok(self.feeds.contains_key(&key(database_uri, name)))
    }

    async fn validate_feed_options(
        &self,
        database_uri: &str,
        name: &str,
        expected: &ChangeFeedOptions,
    ) -> PortResult<()> {
        self.probe.enter("validate_feed_options")?;
        let actual = self
            .feed(database_uri, name)
            .ok_or_else(|| PortError::NotFound(name.to_string()))?;

        if actual.retention_period != expected.retention_period {
            return Err(PortError::InvalidState(format!(
                "retention_period is {}, expected {}",
                actual.retention_period, expected.retention_period
            )));
        }
        if actual.value_capture_type != expected.value_capture_type {
            return Err(PortError::InvalidState(format!(
                "value_capture_type is {}, expected {}",
                actual.value_capture_type, expected.value_capture_type
            )));
        }
        Ok(())
    }

    async fn create_feed(
        &self,
        database_uri: &str,
        name: &str,
        options: &ChangeFeedOptions,
    ) -> PortResult<()> {
        self.probe.enter("create_feed")?;
        match self.feeds.entry(key(database_uri, name)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(PortError::AlreadyExists(name.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(options.clone());
                Ok(())
            }
        }
    }

    async fn drop_feed(&self, database_uri: &str, name: &str) -> PortResult<()> {
        self.probe.enter("drop_feed")?;
        self.feeds
            .remove(&key(database_uri, name))
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DB: &str = "projects/p/instances/i/databases/d";

    #[tokio::test]
    async fn test_create_validate_drop() {
        let admin = InMemoryChangeFeedAdmin::new();
        let options = ChangeFeedOptions::default();

        assert!(!admin.feed_exists(DB, "cs").await.unwrap());
        admin.create_feed(DB, "cs", &options).await.unwrap();
        assert!(admin.feed_exists(DB, "cs").await.unwrap());
        admin.validate_feed_options(DB, "cs", &options).await.unwrap();
        assert!(
            admin
                .create_feed(DB, "cs", &options)
                .await
                .unwrap_err()
                .is_already_exists()
        );

        admin.drop_feed(DB, "cs").await.unwrap();
        assert!(admin.drop_feed(DB, "cs").await.unwrap_err().is_not_found());
    }

    #[rstest]
    #[case("1d", "NEW_ROW", "retention_period")]
    #[case("7d", "OLD_AND_NEW_VALUES", "value_capture_type")]
    #[tokio::test]
    async fn test_validation_reports_mismatch(
        #[case] retention_period: &str,
        #[case] value_capture_type: &str,
        #[case] offending: &str,
    ) {
        let admin = InMemoryChangeFeedAdmin::new();
        admin.insert_feed(
            DB,
            "cs",
            ChangeFeedOptions {
                retention_period: retention_period.into(),
                value_capture_type: value_capture_type.into(),
            },
        );

        let err = admin
            .validate_feed_options(DB, "cs", &ChangeFeedOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidState(msg) if msg.contains(offending)));
    }

    #[tokio::test]
    async fn test_validation_of_missing_feed() {
        let admin = InMemoryChangeFeedAdmin::new();
        let err = admin
            .validate_feed_options(DB, "cs", &ChangeFeedOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
