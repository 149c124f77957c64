use anyhow::Context;
use clap::Subcommand;
use jmc::{
    data::RestaurantBuilder, validate::validate_restaurant, InitOutcome, Restaurant, Service,
};

#[derive(Subcommand, Debug, PartialEq)]
pub(super) enum Command {
    /// Print one random restaurant
    Recommend,
    /// Create an empty data file, or check the existing one
    Init,
    /// Print every restaurant
    List,
    /// Add a restaurant
    Add {
        name: String,
        /// 0 to 5, in steps of 0.5
        #[arg(short, long)]
        rating: f64,
        /// Repeat for more than one category
        #[arg(short, long = "category", required = true)]
        categories: Vec<String>,
        /// Kakao map link
        #[arg(short, long)]
        url: String,
        #[arg(long)]
        visited: bool,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Remove a restaurant by name
    Remove { name: String },
    /// Fuzzy search restaurants by name
    Search { pattern: String },
}

pub(super) fn format_line(rest: &Restaurant) -> String {
    let mark = if rest.visited { " (visited)" } else { "" };
    format!(
        "{} {:.1} [{}] {}{mark}",
        rest.name,
        rest.rating,
        rest.categories.join(", "),
        rest.kakao_url
    )
}

impl Command {
    // consumes the command
    pub(super) async fn run(self, service: &Service) -> anyhow::Result<()> {
        let path = service.repository().path().display().to_string();
        match self {
            Self::Recommend => {
                let picked = service
                    .recommend()
                    .await
                    .with_context(|| format!("fail to read restaurant list from {path}"))?;
                match picked {
                    Some(rest) => println!("{}", format_line(&rest)),
                    None => println!("No restaurant yet. Add one with `jmc add`."),
                }
            }
            Self::Init => {
                let outcome = service
                    .init()
                    .await
                    .with_context(|| format!("{path} is not usable"))?;
                match outcome {
                    InitOutcome::Created => println!("Created {path}."),
                    InitOutcome::AlreadyValid => println!("{path} already exists and is valid."),
                }
            }
            Self::List => {
                let data = service
                    .get_all()
                    .await
                    .with_context(|| format!("fail to read restaurant list from {path}"))?;
                for rest in data.restaurants() {
                    println!("{}", format_line(rest));
                }
            }
            Self::Add {
                name,
                rating,
                categories,
                url,
                visited,
                description,
            } => {
                let mut builder = RestaurantBuilder::default();
                builder
                    .name(name)
                    .rating(rating)
                    .categories(categories)
                    .kakao_url(url)
                    .visited(visited);
                if let Some(description) = description {
                    builder.description(description);
                }
                let rest = builder.build()?;
                validate_restaurant(&rest)?;

                let name = rest.name.clone();
                service
                    .create(rest)
                    .await
                    .with_context(|| format!("fail to add {name}"))?;
                println!("Added {name}.");
            }
            Self::Remove { name } => {
                service
                    .delete(&name)
                    .await
                    .with_context(|| format!("fail to remove {name}"))?;
                println!("Removed {name}.");
            }
            Self::Search { pattern } => {
                let hits = service.search(&pattern).await?;
                if hits.is_empty() {
                    println!("Nothing matches {pattern:?}.");
                }
                for rest in hits {
                    println!("{}", format_line(&rest));
                }
            }
        }

        Ok(())
    }
}
