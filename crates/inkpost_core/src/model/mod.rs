//! Content domain model.
//!
//! # Responsibility
//! - Define the three persisted entities and their creation/edit inputs.
//! - Define the tagged `Ref<T>` used for every cross-entity reference.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId` assigned at creation.
//! - `User.blogs`, `User.comments` and `Blog.comments` are denormalized caches
//!   of the owning fields `Blog.user`, `Comment.user` and `Comment.blog`.

pub mod blog;
pub mod comment;
pub mod entity;
pub mod user;
pub mod validation;
