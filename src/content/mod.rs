mod comments;
mod newsletter;
mod posts;
mod tags;

pub use self::{
    comments::{CommentInput, create_comment, list_comments, thread_comments},
    newsletter::{normalize_email, subscribers_csv},
    posts::{
        PostInput, ReactionKind, create_post, next_published_at, post_detail, update_post,
    },
    tags::{link_tags, parse_tags},
};
