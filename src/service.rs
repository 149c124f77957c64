use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::{Restaurant, RestaurantData, SaveRequest};
use crate::repository::{merge_batch, InitOutcome, Repository, RepositoryError};
use crate::validate::check_unique_names;

/// Domain operations on top of a [`Repository`].
///
/// Writes are checked against the current document for name clashes and
/// then handed to the repository, which loads the file again. Callers that
/// share a service across tasks must serialize writes for that check to
/// hold.
#[derive(Debug, Clone)]
pub struct Service {
    repo: Repository,
}

impl Service {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub async fn get_all(&self) -> Result<RestaurantData, RepositoryError> {
        self.repo.load_all().await
    }

    /// Fails with a `DuplicateName` validation error when the list would
    /// end up with two restaurants of the same name.
    pub async fn create(&self, item: Restaurant) -> Result<(), RepositoryError> {
        let mut rests = self.current().await?;
        rests.push(item.clone());
        check_unique_names(&rests)?;
        self.repo.create_one(item).await
    }

    /// Renaming onto another restaurant's name is rejected like in
    /// [`Service::create`].
    pub async fn update(&self, name: &str, item: Restaurant) -> Result<(), RepositoryError> {
        let mut rests = self.current().await?;
        if let Some(slot) = rests.iter_mut().find(|r| r.name == name) {
            *slot = item.clone();
            check_unique_names(&rests)?;
        }
        self.repo.update_one(name, item).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        self.repo.delete_one(name).await
    }

    pub async fn save_batch(&self, req: SaveRequest) -> Result<RestaurantData, RepositoryError> {
        let mut rests = self.current().await?;
        merge_batch(&mut rests, req.clone());
        check_unique_names(&rests)?;
        self.repo.save_batch(req).await
    }

    async fn current(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self.repo.load_all().await?.restaurants.unwrap_or_default())
    }

    pub async fn init(&self) -> Result<InitOutcome, RepositoryError> {
        self.repo.init().await
    }

    /// Pick one restaurant at random. `None` means there is nothing to pick
    /// from, which is not an error.
    pub async fn recommend(&self) -> Result<Option<Restaurant>, RepositoryError> {
        let data = self.repo.load_all().await?;
        // fresh seed every call
        let mut rng = StdRng::from_entropy();
        Ok(data.restaurants().choose(&mut rng).cloned())
    }

    /// Restaurants whose name fuzzy matches `pattern`, best match first.
    pub async fn search(&self, pattern: &str) -> Result<Vec<Restaurant>, RepositoryError> {
        let data = self.repo.load_all().await?;
        let matcher = SkimMatcherV2::default();
        let mut hits = data
            .restaurants
            .unwrap_or_default()
            .into_iter()
            .filter_map(|rest| {
                matcher
                    .fuzzy_match(&rest.name, pattern)
                    .map(|score| (score, rest))
            })
            .collect::<Vec<_>>();
        // stable, so equal scores keep file order
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(hits.into_iter().map(|(_, rest)| rest).collect())
    }
}
