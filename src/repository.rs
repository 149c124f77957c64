use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::data::{Restaurant, RestaurantData, SaveRequest};
use crate::validate::{validate_document, ValidationError};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("fail to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fail to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fail to serialize restaurant data: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("restaurant not found: {0}")]
    NotFound(String),
    #[error("invalid restaurant data: {0}")]
    Invalid(#[from] ValidationError),
}

/// What [`Repository::init`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyValid,
}

/// Handle on the JSON document at one path.
///
/// Nothing is cached: every call reads the file, works on the fresh copy and
/// writes the whole document back. Two writers running at once will
/// overwrite each other, callers that share a repository must serialize
/// their writes.
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
}

impl Repository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> RepositoryError {
        RepositoryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub async fn load_all(&self) -> Result<RestaurantData, RepositoryError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        let data: RestaurantData =
            serde_json::from_slice(&raw).map_err(|source| RepositoryError::Parse {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(
            path = %self.path.display(),
            restaurants = data.restaurants().len(),
            "loaded restaurant data"
        );
        Ok(data)
    }

    /// Sibling file the next document is written to before it replaces the
    /// real one.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Overwrite the file with `data`, pretty printed with four space indent.
    ///
    /// The document is written next to the target and renamed over it, so
    /// readers see either the old file or the new one, and a failed write
    /// leaves the old file in place.
    pub async fn save_all(&self, data: &RestaurantData) -> Result<(), RepositoryError> {
        let bytes = to_pretty_json(data).map_err(RepositoryError::Serialize)?;
        let staging = self.staging_path();

        let result = match tokio::fs::write(&staging, bytes).await {
            Ok(()) => tokio::fs::rename(&staging, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tokio::fs::remove_file(&staging).await.ok();
            return Err(self.io_err(e));
        }

        tracing::debug!(path = %self.path.display(), "saved restaurant data");
        Ok(())
    }

    pub async fn create_one(&self, item: Restaurant) -> Result<(), RepositoryError> {
        let mut data = self.load_all().await?;
        tracing::info!(restaurant = %item.name, "adding restaurant");
        data.restaurants_mut().push(item);
        self.save_all(&data).await
    }

    /// Replace the first restaurant called `name`, keeping its position.
    pub async fn update_one(&self, name: &str, item: Restaurant) -> Result<(), RepositoryError> {
        let mut data = self.load_all().await?;
        let Some(slot) = data.restaurants_mut().iter_mut().find(|r| r.name == name) else {
            return Err(RepositoryError::NotFound(name.to_string()));
        };
        tracing::info!(restaurant = name, replacement = %item.name, "updating restaurant");
        *slot = item;
        self.save_all(&data).await
    }

    /// Remove the first restaurant called `name`.
    pub async fn delete_one(&self, name: &str) -> Result<(), RepositoryError> {
        let mut data = self.load_all().await?;
        let rests = data.restaurants_mut();
        let Some(idx) = rests.iter().position(|r| r.name == name) else {
            return Err(RepositoryError::NotFound(name.to_string()));
        };
        tracing::info!(restaurant = name, "deleting restaurant");
        rests.remove(idx);
        self.save_all(&data).await
    }

    pub async fn save_batch(&self, req: SaveRequest) -> Result<RestaurantData, RepositoryError> {
        let mut data = self.load_all().await?;
        tracing::info!(
            new = req.new.len(),
            update = req.update.len(),
            delete = req.delete.len(),
            "applying batch"
        );
        merge_batch(data.restaurants_mut(), req);
        self.save_all(&data).await?;
        Ok(data)
    }

    /// Write an empty document if there is no file yet, otherwise check the
    /// existing one.
    pub async fn init(&self) -> Result<InitOutcome, RepositoryError> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(path = %self.path.display(), "creating empty data file");
                self.save_all(&RestaurantData::empty()).await?;
                return Ok(InitOutcome::Created);
            }
            Err(e) => return Err(self.io_err(e)),
        }

        let data = self.load_all().await?;
        validate_document(&data)?;
        Ok(InitOutcome::AlreadyValid)
    }
}

fn to_pretty_json(data: &RestaurantData) -> Result<Vec<u8>, serde_json::Error> {
    use serde::Serialize;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    Ok(buf)
}

/// Delete, then update, then append, all on the same list.
///
/// Deletes run first, so a name that is both deleted and updated is gone.
/// When `update` names the same restaurant twice the later entry is used.
/// Nothing in `new` is checked against existing names.
pub(crate) fn merge_batch(rests: &mut Vec<Restaurant>, req: SaveRequest) {
    let SaveRequest {
        new,
        update,
        delete,
    } = req;

    let delete: HashSet<String> = delete.into_iter().collect();
    rests.retain(|r| !delete.contains(&r.name));

    let update: HashMap<String, Restaurant> = update
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect();
    for rest in rests.iter_mut() {
        if let Some(replacement) = update.get(&rest.name) {
            *rest = replacement.clone();
        }
    }

    rests.extend(new);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RestaurantBuilder;
    use serde_json::json;

    fn rest(name: &str) -> Restaurant {
        RestaurantBuilder::default()
            .name(name)
            .rating(3.0)
            .categories(vec!["korean".to_string()])
            .kakao_url(format!("https://place.map.kakao.com/{name}"))
            .build()
            .unwrap()
    }

    fn names(data: &RestaurantData) -> Vec<&str> {
        data.restaurants().iter().map(|r| r.name.as_str()).collect()
    }

    async fn setup(rests: &[&str]) -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path().join("data.json"));
        let mut data = RestaurantData::empty();
        data.restaurants_mut().extend(rests.iter().map(|n| rest(n)));
        data.config.insert("theme".into(), json!("dark"));
        repo.save_all(&data).await.unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path().join("nope.json"));
        let err = repo.load_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let (_dir, repo) = setup(&[]).await;
        tokio::fs::write(repo.path(), b"{\"restaurants\": [").await.unwrap();
        let err = repo.load_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Parse { .. }), "{err}");

        tokio::fs::write(repo.path(), br#"{"restaurants": "KFC"}"#).await.unwrap();
        let err = repo.load_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Parse { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        tokio::fs::write(
            repo.path(),
            serde_json::to_vec(&json!({
                "restaurants": [{
                    "name": "A",
                    "rating": 4.5,
                    "categories": ["ramen", "japanese"],
                    "kakao_url": "https://place.map.kakao.com/1",
                    "visited": true,
                    "menus": [{"name": "shoyu", "rating": 4.0, "price": 9000.0, "description": "rich"}]
                }],
                "config": {"z": [1, 2, {"deep": null}], "a": true}
            }))
            .unwrap(),
        )
        .await
        .unwrap();

        let first = repo.load_all().await.unwrap();
        repo.save_all(&first).await.unwrap();
        let second = repo.load_all().await.unwrap();
        assert_eq!(first, second);

        let keys = second.config.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["z", "a"]);
    }

    #[tokio::test]
    async fn test_save_uses_four_space_indent() {
        let (_dir, repo) = setup(&[]).await;
        let text = tokio::fs::read_to_string(repo.path()).await.unwrap();
        assert!(text.starts_with("{\n    \"restaurants\": []"), "{text}");
    }

    #[tokio::test]
    async fn test_create_appends() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        repo.create_one(rest("C")).await.unwrap();
        let data = repo.load_all().await.unwrap();
        assert_eq!(names(&data), ["A", "B", "C"]);
        assert_eq!(data.config["theme"], "dark");
    }

    #[tokio::test]
    async fn test_create_on_absent_collection() {
        let (_dir, repo) = setup(&[]).await;
        tokio::fs::write(repo.path(), b"{}").await.unwrap();
        repo.create_one(rest("A")).await.unwrap();
        assert_eq!(names(&repo.load_all().await.unwrap()), ["A"]);
    }

    #[tokio::test]
    async fn test_update_keeps_position() {
        let (_dir, repo) = setup(&["A", "B", "C"]).await;
        let mut b2 = rest("B2");
        b2.visited = true;
        repo.update_one("B", b2).await.unwrap();

        let data = repo.load_all().await.unwrap();
        assert_eq!(names(&data), ["A", "B2", "C"]);
        assert!(data.restaurants()[1].visited);

        let err = repo.update_one("Z", rest("Z")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(name) if name == "Z"));
        assert_eq!(names(&repo.load_all().await.unwrap()), ["A", "B2", "C"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_hit_first_match() {
        let (_dir, repo) = setup(&["A", "B", "A"]).await;
        let mut a2 = rest("A");
        a2.rating = 5.0;
        repo.update_one("A", a2).await.unwrap();
        let data = repo.load_all().await.unwrap();
        assert_eq!(data.restaurants()[0].rating, 5.0);
        assert_eq!(data.restaurants()[2].rating, 3.0);

        repo.delete_one("A").await.unwrap();
        let data = repo.load_all().await.unwrap();
        assert_eq!(names(&data), ["B", "A"]);
        assert_eq!(data.restaurants()[1].rating, 3.0);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        repo.delete_one("A").await.unwrap();
        assert_eq!(names(&repo.load_all().await.unwrap()), ["B"]);

        let err = repo.delete_one("A").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_appends_new() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        let req = SaveRequest {
            new: vec![rest("X")],
            ..Default::default()
        };
        let data = repo.save_batch(req).await.unwrap();
        assert_eq!(names(&data), ["A", "B", "X"]);
        assert_eq!(repo.load_all().await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_batch_delete_beats_update() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        let mut a2 = rest("A");
        a2.visited = true;
        let req = SaveRequest {
            update: vec![a2],
            delete: vec!["A".into()],
            ..Default::default()
        };
        let data = repo.save_batch(req).await.unwrap();
        assert_eq!(names(&data), ["B"]);
    }

    #[tokio::test]
    async fn test_batch_full_merge() {
        let (_dir, repo) = setup(&["A", "B", "C", "D"]).await;
        let mut c_first = rest("C");
        c_first.rating = 1.0;
        let mut c_last = rest("C");
        c_last.rating = 4.5;
        let req = SaveRequest {
            new: vec![rest("E"), rest("C")],
            update: vec![c_first, c_last, rest("missing")],
            delete: vec!["B".into(), "nope".into()],
        };

        let data = repo.save_batch(req).await.unwrap();
        assert_eq!(names(&data), ["A", "C", "D", "E", "C"]);
        assert_eq!(data.restaurants()[1].rating, 4.5);
        assert_eq!(data.restaurants()[4].rating, 3.0);
        assert_eq!(data.config["theme"], "dark");
    }

    #[tokio::test]
    async fn test_batch_empty_request_keeps_document() {
        let (_dir, repo) = setup(&["A"]).await;
        let before = repo.load_all().await.unwrap();
        let after = repo.save_batch(SaveRequest::default()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_init_creates_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path().join("data.json"));

        assert_eq!(repo.init().await.unwrap(), InitOutcome::Created);
        assert_eq!(repo.load_all().await.unwrap(), RestaurantData::empty());
        assert_eq!(repo.init().await.unwrap(), InitOutcome::AlreadyValid);

        tokio::fs::write(repo.path(), br#"{"config": {}}"#).await.unwrap();
        let err = repo.init().await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid(ValidationError::MissingCollection { .. })
        ));

        tokio::fs::write(repo.path(), b"not json").await.unwrap();
        let err = repo.init().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Parse { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_save_to_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data.json");
        tokio::fs::create_dir(&target).await.unwrap();
        let repo = Repository::new(&target);

        let err = repo.save_all(&RestaurantData::empty()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }), "{err}");
        assert!(tokio::fs::metadata(&target).await.unwrap().is_dir());
        assert!(!tokio::fs::try_exists(repo.staging_path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_old_document() {
        let (_dir, repo) = setup(&["A", "B"]).await;
        let before = tokio::fs::read(repo.path()).await.unwrap();

        // the staging file cannot be created while a directory holds its name
        tokio::fs::create_dir(repo.staging_path()).await.unwrap();
        let err = repo.create_one(rest("C")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }), "{err}");

        assert_eq!(tokio::fs::read(repo.path()).await.unwrap(), before);
        assert_eq!(names(&repo.load_all().await.unwrap()), ["A", "B"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_document() {
        let many = (0..3000).map(|i| format!("restaurant {i}")).collect::<Vec<_>>();
        let many = many.iter().map(String::as_str).collect::<Vec<_>>();
        let (_dir, repo) = setup(&many).await;
        let doc = repo.load_all().await.unwrap();

        let writer = {
            let repo = repo.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    repo.save_all(&doc).await.unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let repo = repo.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..250 {
                    let data = repo.load_all().await.unwrap();
                    assert_eq!(data.restaurants().len(), 3000);
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
