//! Data models for cinescore-rf

pub mod rating;

pub use rating::{
    ImdbRating, MediaType, MetacriticRating, RatingSet, RottenTomatoesRating, TitleQuery,
};
