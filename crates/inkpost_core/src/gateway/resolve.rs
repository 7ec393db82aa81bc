//! Field resolvers and the per-request context they run against.
//!
//! # Invariants
//! - Relationship fields read through the owning-field queries (`user_id`,
//!   `blog_id`), never through the cached id lists.
//! - A single-reference field whose target is gone resolves to `Null`.
//! - Every mutation goes through the consistency coordinator.

use crate::model::blog::{Blog, BlogEdit, NewBlog};
use crate::model::comment::{Comment, NewComment};
use crate::model::entity::{EntityId, Ref};
use crate::model::user::User;
use crate::model::validation::parse_id;
use crate::repo::blog_repo::BlogRepository;
use crate::repo::comment_repo::CommentRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::coordinator::{ConsistencyCoordinator, SignUpRequest};
use crate::service::error::ServiceError;
use async_graphql::dynamic::FieldValue;
use async_graphql::{ErrorExtensions, Value};
use std::collections::HashMap;

/// Store access handed to every resolver of one request.
pub struct ResolveContext<'a> {
    pub users: &'a dyn UserRepository,
    pub blogs: &'a dyn BlogRepository,
    pub comments: &'a dyn CommentRepository,
    pub coordinator: &'a ConsistencyCoordinator<'a>,
}

/// Value a selection set is evaluated against.
#[derive(Debug, Clone)]
pub enum Node {
    Root,
    User(User),
    Blog(Blog),
    Comment(Comment),
}

/// Output of one resolver before sub-selections are applied.
#[derive(Debug, Clone)]
pub enum Resolved {
    Null,
    Scalar(Value),
    Object(Node),
    List(Vec<Node>),
}

impl Resolved {
    fn optional(node: Option<Node>) -> Self {
        node.map_or(Self::Null, Self::Object)
    }

    /// Hands the value to the engine; object nodes become the parent value of
    /// their own field resolvers.
    pub(crate) fn into_field_value<'a>(self) -> Option<FieldValue<'a>> {
        match self {
            Self::Null => None,
            Self::Scalar(value) => Some(FieldValue::value(value)),
            Self::Object(node) => Some(FieldValue::owned_any(node)),
            Self::List(nodes) => Some(FieldValue::list(
                nodes.into_iter().map(FieldValue::owned_any),
            )),
        }
    }
}

/// Field failure carried into the response `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub message: String,
    pub code: &'static str,
}

impl ResolveError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: "INTERNAL_ERROR",
        }
    }

    /// Engine error carrying `code` in its extensions.
    pub(crate) fn into_engine_error(self) -> async_graphql::Error {
        let code = self.code;
        async_graphql::Error::new(self.message)
            .extend_with(|_, extensions| extensions.set("code", code))
    }
}

impl From<ServiceError> for ResolveError {
    fn from(value: ServiceError) -> Self {
        Self {
            message: value.to_string(),
            code: value.code(),
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

/// Coerced argument values of one field, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(HashMap<String, String>);

impl Arguments {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn string(&self, name: &str) -> Result<&str, ResolveError> {
        self.0
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ResolveError::internal(format!("argument `{name}` was not coerced")))
    }

    pub fn id(&self, name: &str) -> Result<EntityId, ResolveError> {
        let raw = self.string(name)?;
        parse_id(name, raw).map_err(|err| ServiceError::from(err).into())
    }
}

/// One field invocation as seen by its resolver.
pub struct FieldCall<'a> {
    pub parent: &'a Node,
    pub name: &'a str,
    pub args: &'a Arguments,
}

pub type Resolver = fn(&ResolveContext<'_>, &FieldCall<'_>) -> Result<Resolved, ResolveError>;

fn text(value: &str) -> Result<Resolved, ResolveError> {
    Ok(Resolved::Scalar(Value::String(value.to_string())))
}

fn id_value(id: EntityId) -> Result<Resolved, ResolveError> {
    Ok(Resolved::Scalar(Value::String(id.to_string())))
}

fn timestamp(millis: i64) -> Result<Resolved, ResolveError> {
    Ok(Resolved::Scalar(Value::from(millis)))
}

fn unexpected_parent(call: &FieldCall<'_>) -> ResolveError {
    ResolveError::internal(format!(
        "field `{}` resolved against {:?}",
        call.name, call.parent
    ))
}

fn parent_user<'a>(call: &FieldCall<'a>) -> Result<&'a User, ResolveError> {
    match call.parent {
        Node::User(user) => Ok(user),
        _ => Err(unexpected_parent(call)),
    }
}

fn parent_blog<'a>(call: &FieldCall<'a>) -> Result<&'a Blog, ResolveError> {
    match call.parent {
        Node::Blog(blog) => Ok(blog),
        _ => Err(unexpected_parent(call)),
    }
}

fn parent_comment<'a>(call: &FieldCall<'a>) -> Result<&'a Comment, ResolveError> {
    match call.parent {
        Node::Comment(comment) => Ok(comment),
        _ => Err(unexpected_parent(call)),
    }
}

fn lookup_user(ctx: &ResolveContext<'_>, user: Ref<User>) -> Result<Resolved, ResolveError> {
    Ok(Resolved::optional(ctx.users.get_user(user.id())?.map(Node::User)))
}

fn lookup_blog(ctx: &ResolveContext<'_>, blog: Ref<Blog>) -> Result<Resolved, ResolveError> {
    Ok(Resolved::optional(ctx.blogs.get_blog(blog.id())?.map(Node::Blog)))
}

fn users_list(users: Vec<User>) -> Resolved {
    Resolved::List(users.into_iter().map(Node::User).collect())
}

fn blogs_list(blogs: Vec<Blog>) -> Resolved {
    Resolved::List(blogs.into_iter().map(Node::Blog).collect())
}

fn comments_list(comments: Vec<Comment>) -> Resolved {
    Resolved::List(comments.into_iter().map(Node::Comment).collect())
}

pub(crate) mod query {
    use super::*;

    pub fn users(ctx: &ResolveContext<'_>, _: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        Ok(users_list(ctx.users.list_users()?))
    }

    pub fn user(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        lookup_user(ctx, Ref::new(call.args.id("id")?))
    }

    pub fn blogs(ctx: &ResolveContext<'_>, _: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        Ok(blogs_list(ctx.blogs.list_blogs()?))
    }

    pub fn blog(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        lookup_blog(ctx, Ref::new(call.args.id("id")?))
    }

    pub fn comments(ctx: &ResolveContext<'_>, _: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        Ok(comments_list(ctx.comments.list_comments()?))
    }

    pub fn comment(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let id = call.args.id("id")?;
        Ok(Resolved::optional(
            ctx.comments.get_comment(id)?.map(Node::Comment),
        ))
    }
}

pub(crate) mod mutation {
    use super::*;

    pub fn sign_up(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let request = SignUpRequest {
            name: call.args.string("name")?.to_string(),
            email: call.args.string("email")?.to_string(),
            password: call.args.string("password")?.to_string(),
        };
        Ok(Resolved::Object(Node::User(ctx.coordinator.sign_up(&request)?)))
    }

    pub fn login(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let user = ctx
            .coordinator
            .login(call.args.string("email")?, call.args.string("password")?)?;
        Ok(Resolved::Object(Node::User(user)))
    }

    pub fn add_blog(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let blog = NewBlog {
            title: call.args.string("title")?.to_string(),
            content: call.args.string("content")?.to_string(),
            date: call.args.string("date")?.to_string(),
            user: Ref::new(call.args.id("user")?),
        };
        Ok(Resolved::Object(Node::Blog(ctx.coordinator.add_blog(&blog)?)))
    }

    pub fn update_blog(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let id = call.args.id("id")?;
        let edit = BlogEdit {
            title: call.args.string("title")?.to_string(),
            content: call.args.string("content")?.to_string(),
            date: call.args.string("date")?.to_string(),
        };
        Ok(Resolved::Object(Node::Blog(
            ctx.coordinator.update_blog(id, &edit)?,
        )))
    }

    pub fn delete_blog(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let deleted = ctx.coordinator.delete_blog(call.args.id("id")?)?;
        Ok(Resolved::Object(Node::Blog(deleted)))
    }

    pub fn add_comment(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let comment = NewComment {
            text: call.args.string("text")?.to_string(),
            date: call.args.string("date")?.to_string(),
            user: Ref::new(call.args.id("user")?),
            blog: Ref::new(call.args.id("blog")?),
        };
        Ok(Resolved::Object(Node::Comment(
            ctx.coordinator.add_comment(&comment)?,
        )))
    }

    pub fn delete_comment(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let deleted = ctx.coordinator.delete_comment(call.args.id("id")?)?;
        Ok(Resolved::Object(Node::Comment(deleted)))
    }
}

pub(crate) mod user {
    use super::*;

    pub fn id(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        id_value(parent_user(call)?.id)
    }

    pub fn name(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        text(&parent_user(call)?.name)
    }

    pub fn email(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        text(&parent_user(call)?.email)
    }

    pub fn blogs(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let user = parent_user(call)?;
        Ok(blogs_list(ctx.blogs.list_blogs_by_user(user.id)?))
    }

    pub fn comments(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let user = parent_user(call)?;
        Ok(comments_list(ctx.comments.list_comments_by_user(user.id)?))
    }

    pub fn created_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_user(call)?.created_at)
    }

    pub fn updated_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_user(call)?.updated_at)
    }
}

pub(crate) mod blog {
    use super::*;

    pub fn id(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        id_value(parent_blog(call)?.id)
    }

    pub fn title(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        text(&parent_blog(call)?.title)
    }

    pub fn content(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        text(&parent_blog(call)?.content)
    }

    pub fn date(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        text(&parent_blog(call)?.date)
    }

    pub fn user(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        lookup_user(ctx, parent_blog(call)?.user)
    }

    pub fn comments(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        let blog = parent_blog(call)?;
        Ok(comments_list(ctx.comments.list_comments_by_blog(blog.id)?))
    }

    pub fn created_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_blog(call)?.created_at)
    }

    pub fn updated_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_blog(call)?.updated_at)
    }
}

pub(crate) mod comment {
    use super::*;

    pub fn id(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        id_value(parent_comment(call)?.id)
    }

    pub fn text(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        super::text(&parent_comment(call)?.text)
    }

    pub fn date(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        super::text(&parent_comment(call)?.date)
    }

    pub fn user(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        lookup_user(ctx, parent_comment(call)?.user)
    }

    pub fn blog(ctx: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        lookup_blog(ctx, parent_comment(call)?.blog)
    }

    pub fn created_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_comment(call)?.created_at)
    }

    pub fn updated_at(_: &ResolveContext<'_>, call: &FieldCall<'_>) -> Result<Resolved, ResolveError> {
        timestamp(parent_comment(call)?.updated_at)
    }
}
