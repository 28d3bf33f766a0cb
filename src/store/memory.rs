use super::{StoreError, User, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process credential store.
///
/// Used by tests and local demos. Uniqueness is checked under the write lock,
/// matching the guarantee a database unique index gives.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Provider;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new(email.to_string(), None, None, Provider::Google)
    }

    #[tokio::test]
    async fn insert_then_find() -> anyhow::Result<()> {
        let store = MemoryUserStore::new();
        let record = user("a@x.com");
        store.insert(&record).await?;

        assert_eq!(store.find_by_email("a@x.com").await?, Some(record));
        assert_eq!(store.find_by_email("b@x.com").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_first_record() -> anyhow::Result<()> {
        let store = MemoryUserStore::new();
        let first = user("a@x.com");
        store.insert(&first).await?;

        let result = store.insert(&user("a@x.com")).await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
        assert_eq!(store.find_by_email("a@x.com").await?, Some(first));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_inserts_admit_one() {
        let store = Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(&user("race@x.com")).await })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => created += 1,
                Ok(Err(StoreError::Duplicate)) => duplicates += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.len().await, 1);
    }
}
