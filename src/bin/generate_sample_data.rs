// Seeds the configured database with groups, users, posts, follows and comments

use tracing::info;
use tracing_subscriber::EnvFilter;

use yatube::{
    config::Config,
    infrastructure::{sqlite_database::Database, viewer::ViewerContext},
    services::{CommentService, FollowService, PostDraft, PostService},
    AppResult,
};

const GROUPS: &[(&str, &str, &str)] = &[
    ("Cats", "cats", "Everything about cats"),
    ("Travel", "travel", "Trip reports and photos"),
    ("Rust", "rust", "Systems programming talk"),
];

const USERS: &[&str] = &["leo", "ann", "max", "zoe"];

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let db = Database::connect(&config.database).await?;
    info!("Generating sample data in {}", config.database.url);

    let mut groups = Vec::new();
    for (title, slug, description) in GROUPS {
        let group = match db.get_group_by_slug(slug).await? {
            Some(group) => group,
            None => db.create_group(title, slug, description).await?,
        };
        groups.push(group);
    }

    let mut viewers = Vec::new();
    for (i, username) in USERS.iter().enumerate() {
        let user = db.ensure_user(username).await?;
        viewers.push(ViewerContext::authenticated_user(user, format!("seed-{}", i)));
    }

    let posts = PostService::new(db.clone());
    let comments = CommentService::new(db.clone());
    let follows = FollowService::new(db.clone());

    let mut created = Vec::new();
    for n in 0..24 {
        let author = &viewers[n % viewers.len()];
        let mut draft = PostDraft::new(format!(
            "Post #{} by {}",
            n + 1,
            author.username().unwrap_or_default()
        ));
        if n % 4 != 3 {
            draft = draft.with_group(groups[n % groups.len()].id);
        }
        created.push(posts.create_post(author, draft).await?);
    }

    for (i, viewer) in viewers.iter().enumerate() {
        let next = USERS[(i + 1) % USERS.len()];
        follows.follow(viewer, next).await?;
    }

    for (i, post) in created.iter().enumerate().step_by(3) {
        let commenter = &viewers[(i + 1) % viewers.len()];
        comments.add_comment(post.id, commenter, "Nice post!").await?;
    }

    info!(
        "Seeded {} groups, {} users, {} posts",
        groups.len(),
        viewers.len(),
        created.len()
    );
    Ok(())
}
