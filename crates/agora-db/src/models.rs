//! Database row types. These map directly to SQLite rows and are
//! distinct from the agora-types API models to keep the DB layer independent.

use agora_types::models::{Comment, Like, Post, Relationship, Story, User};
use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub name: String,
    pub cover_pic: Option<String>,
    pub profile_pic: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
}

pub struct PostRow {
    pub id: i64,
    pub description: Option<String>,
    pub img: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_profile_pic: Option<String>,
}

pub struct CommentRow {
    pub id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub post_id: i64,
    pub author_name: String,
    pub author_profile_pic: Option<String>,
}

pub struct StoryRow {
    pub id: i64,
    pub img: Option<String>,
    pub user_id: i64,
}

pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
}

pub struct RelationshipRow {
    pub id: i64,
    pub follower_user_id: i64,
    pub followed_user_id: i64,
}

// -- Inputs --

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Default)]
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub cover_pic: Option<&'a str>,
    pub profile_pic: Option<&'a str>,
    pub city: Option<&'a str>,
    pub website: Option<&'a str>,
}

#[derive(Default)]
pub struct PostFields<'a> {
    pub description: Option<&'a str>,
    pub img: Option<&'a str>,
}

// -- Filters --

pub enum PostFilter {
    /// Posts authored by one user.
    ByUser(i64),
    /// The subject's own posts plus posts of everyone they follow.
    Feed(i64),
}

pub enum StoryFilter {
    ByUser(i64),
    Feed(i64),
}

pub enum RelationshipFilter {
    Follower(i64),
    Followed(i64),
}

// -- Row -> API model --

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
            cover_pic: row.cover_pic,
            profile_pic: row.profile_pic,
            city: row.city,
            website: row.website,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            desc: row.description,
            img: row.img,
            user_id: row.user_id,
            created_at: row.created_at,
            name: row.author_name,
            profile_pic: row.author_profile_pic,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            desc: row.description,
            created_at: row.created_at,
            user_id: row.user_id,
            post_id: row.post_id,
            name: row.author_name,
            profile_pic: row.author_profile_pic,
        }
    }
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Story {
            id: row.id,
            img: row.img,
            user_id: row.user_id,
        }
    }
}

impl From<LikeRow> for Like {
    fn from(row: LikeRow) -> Self {
        Like {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
        }
    }
}

impl From<RelationshipRow> for Relationship {
    fn from(row: RelationshipRow) -> Self {
        Relationship {
            id: row.id,
            follower_user_id: row.follower_user_id,
            followed_user_id: row.followed_user_id,
        }
    }
}
