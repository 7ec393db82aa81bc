//! Typed schema graph for the gateway.
//!
//! # Responsibility
//! - Declare root and object types with their fields, arguments and output
//!   types.
//! - Bind each `(type, field)` pair to exactly one resolver.
//!
//! - Hand the table to the execution engine, which owns parsing, validation,
//!   variable coercion and null propagation.
//!
//! # Invariants
//! - The schema is a plain value built by [`build_schema`]; nothing is
//!   registered globally and the store is supplied per request.
//! - Every argument is a required scalar.
//! - `User` exposes no password field.

use crate::gateway::executor::RequestScope;
use crate::gateway::resolve::{
    blog, comment, mutation, query, user, Arguments, FieldCall, Node, Resolver,
};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Schema as Engine,
    TypeRef,
};
use log::{debug, error};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

pub use async_graphql::dynamic::SchemaError;

/// Deepest selection nesting the engine will execute.
pub const MAX_SELECTION_DEPTH: usize = 32;

/// Root and object types known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Query,
    Mutation,
    User,
    Blog,
    Comment,
}

impl TypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::User => "User",
            Self::Blog => "Blog",
            Self::Comment => "Comment",
        }
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Id,
    String,
    /// Epoch-millisecond timestamps.
    Float,
}

impl ScalarType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::String => "String",
            Self::Float => "Float",
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Scalar(ScalarType),
    Object(TypeName),
    List(TypeName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentDef {
    pub name: &'static str,
    pub ty: ScalarType,
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: OutputType,
    pub non_null: bool,
    pub arguments: Vec<ArgumentDef>,
    pub resolver: Resolver,
}

impl FieldDef {
    fn new(name: &'static str, ty: OutputType, resolver: Resolver) -> Self {
        Self {
            name,
            ty,
            non_null: false,
            arguments: Vec::new(),
            resolver,
        }
    }

    fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    fn arg(mut self, name: &'static str, ty: ScalarType) -> Self {
        self.arguments.push(ArgumentDef { name, ty });
        self
    }

    /// Output type rendered the way clients write it, e.g. `[Blog]!`.
    pub fn type_label(&self) -> String {
        let base = match self.ty {
            OutputType::Scalar(scalar) => scalar.as_str().to_string(),
            OutputType::Object(name) => name.as_str().to_string(),
            OutputType::List(name) => format!("[{name}]"),
        };
        if self.non_null {
            format!("{base}!")
        } else {
            base
        }
    }

    fn type_ref(&self) -> TypeRef {
        match (self.ty, self.non_null) {
            (OutputType::Scalar(scalar), false) => TypeRef::named(scalar.as_str()),
            (OutputType::Scalar(scalar), true) => TypeRef::named_nn(scalar.as_str()),
            (OutputType::Object(name), false) => TypeRef::named(name.as_str()),
            (OutputType::Object(name), true) => TypeRef::named_nn(name.as_str()),
            (OutputType::List(name), false) => TypeRef::named_list(name.as_str()),
            (OutputType::List(name), true) => TypeRef::named_list_nn(name.as_str()),
        }
    }

    fn to_engine_field(&self) -> Field {
        let def = self.clone();
        let field = Field::new(self.name, self.type_ref(), move |ctx| {
            let outcome = dispatch(&ctx, &def);
            FieldFuture::new(async move { outcome })
        });
        self.arguments.iter().fold(field, |field, arg| {
            field.argument(InputValue::new(arg.name, TypeRef::named_nn(arg.ty.as_str())))
        })
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("type", &self.type_label())
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Runs the resolver bound to `def` for one engine field call.
///
/// The resolver finishes before the returned future is created, so the
/// request connection is never held across an await point.
fn dispatch<'a>(
    ctx: &ResolverContext<'a>,
    def: &FieldDef,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let scope = ctx.data::<RequestScope>()?;
    let root = Node::Root;
    let parent = ctx.parent_value.downcast_ref::<Node>().unwrap_or(&root);

    let mut args = Arguments::default();
    for arg in &def.arguments {
        let value = ctx.args.try_get(arg.name)?;
        // ID literals may be written as integers.
        let raw = match value.string() {
            Ok(text) => text.to_string(),
            Err(_) => value.i64()?.to_string(),
        };
        args.insert(arg.name, raw);
    }

    let call = FieldCall {
        parent,
        name: def.name,
        args: &args,
    };
    match scope.run(|resolve| (def.resolver)(resolve, &call)) {
        Ok(resolved) => Ok(resolved.into_field_value()),
        Err(err) => {
            match err.code {
                "TRANSACTION_ERROR" | "INTERNAL_ERROR" => error!(
                    "event=resolve_field module=gateway status=error field={} code={} error={}",
                    def.name, err.code, err.message
                ),
                _ => debug!(
                    "event=resolve_field module=gateway status=failed field={} code={}",
                    def.name, err.code
                ),
            }
            Err(err.into_engine_error())
        }
    }
}

const OBJECT_TYPES: [TypeName; 5] = [
    TypeName::Query,
    TypeName::Mutation,
    TypeName::User,
    TypeName::Blog,
    TypeName::Comment,
];

/// Resolver table plus the executable engine schema built from it.
#[derive(Clone)]
pub struct Schema {
    engine: Engine,
    fields: HashMap<(TypeName, &'static str), FieldDef>,
    order: HashMap<TypeName, Vec<&'static str>>,
}

impl Schema {
    pub fn field(&self, owner: TypeName, name: &str) -> Option<&FieldDef> {
        self.order
            .get(&owner)?
            .iter()
            .find(|candidate| **candidate == name)
            .and_then(|known| self.fields.get(&(owner, *known)))
    }

    /// Fields of `owner` in declaration order.
    pub fn fields_of(&self, owner: TypeName) -> Vec<&FieldDef> {
        self.order
            .get(&owner)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.fields.get(&(owner, *name)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Schema rendered in SDL form, for diagnostics and documentation.
    pub fn sdl(&self) -> String {
        self.engine.sdl()
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct TableBuilder {
    fields: HashMap<(TypeName, &'static str), FieldDef>,
    order: HashMap<TypeName, Vec<&'static str>>,
}

impl TableBuilder {
    fn object(&mut self, owner: TypeName, fields: Vec<FieldDef>) {
        let names = self.order.entry(owner).or_default();
        for field in fields {
            names.push(field.name);
            self.fields.insert((owner, field.name), field);
        }
    }

    fn finish(self) -> Result<Schema, SchemaError> {
        let mut engine = Engine::build(
            TypeName::Query.as_str(),
            Some(TypeName::Mutation.as_str()),
            None,
        );
        for owner in OBJECT_TYPES {
            let object = self
                .order
                .get(&owner)
                .into_iter()
                .flatten()
                .filter_map(|name| self.fields.get(&(owner, *name)))
                .fold(Object::new(owner.as_str()), |object, def| {
                    object.field(def.to_engine_field())
                });
            engine = engine.register(object);
        }
        let engine = engine.limit_depth(MAX_SELECTION_DEPTH).finish()?;

        Ok(Schema {
            engine,
            fields: self.fields,
            order: self.order,
        })
    }
}

/// Builds the resolver table and the engine schema over it.
///
/// # Errors
/// - Returns [`SchemaError`] when the table is inconsistent, e.g. a field
///   names an unregistered type.
pub fn build_schema() -> Result<Schema, SchemaError> {
    use OutputType::{List, Object, Scalar};
    use ScalarType::{Float, Id, String};

    let mut schema = TableBuilder::default();

    schema.object(
        TypeName::Query,
        vec![
            FieldDef::new("users", List(TypeName::User), query::users).non_null(),
            FieldDef::new("user", Object(TypeName::User), query::user).arg("id", Id),
            FieldDef::new("blogs", List(TypeName::Blog), query::blogs).non_null(),
            FieldDef::new("blog", Object(TypeName::Blog), query::blog).arg("id", Id),
            FieldDef::new("comments", List(TypeName::Comment), query::comments).non_null(),
            FieldDef::new("comment", Object(TypeName::Comment), query::comment).arg("id", Id),
        ],
    );

    schema.object(
        TypeName::Mutation,
        vec![
            FieldDef::new("signUp", Object(TypeName::User), mutation::sign_up)
                .arg("name", String)
                .arg("email", String)
                .arg("password", String),
            FieldDef::new("login", Object(TypeName::User), mutation::login)
                .arg("email", String)
                .arg("password", String),
            FieldDef::new("addBlog", Object(TypeName::Blog), mutation::add_blog)
                .arg("title", String)
                .arg("content", String)
                .arg("date", String)
                .arg("user", Id),
            FieldDef::new("updateBlog", Object(TypeName::Blog), mutation::update_blog)
                .arg("id", Id)
                .arg("title", String)
                .arg("content", String)
                .arg("date", String),
            FieldDef::new("deleteBlog", Object(TypeName::Blog), mutation::delete_blog)
                .arg("id", Id),
            FieldDef::new(
                "addCommentToBlog",
                Object(TypeName::Comment),
                mutation::add_comment,
            )
            .arg("text", String)
            .arg("date", String)
            .arg("user", Id)
            .arg("blog", Id),
            FieldDef::new(
                "deleteCommentFromBlog",
                Object(TypeName::Comment),
                mutation::delete_comment,
            )
            .arg("id", Id),
        ],
    );

    schema.object(
        TypeName::User,
        vec![
            FieldDef::new("id", Scalar(Id), user::id).non_null(),
            FieldDef::new("name", Scalar(String), user::name).non_null(),
            FieldDef::new("email", Scalar(String), user::email).non_null(),
            FieldDef::new("blogs", List(TypeName::Blog), user::blogs),
            FieldDef::new("comments", List(TypeName::Comment), user::comments),
            FieldDef::new("createdAt", Scalar(Float), user::created_at),
            FieldDef::new("updatedAt", Scalar(Float), user::updated_at),
        ],
    );

    schema.object(
        TypeName::Blog,
        vec![
            FieldDef::new("id", Scalar(Id), blog::id).non_null(),
            FieldDef::new("title", Scalar(String), blog::title).non_null(),
            FieldDef::new("content", Scalar(String), blog::content).non_null(),
            FieldDef::new("date", Scalar(String), blog::date).non_null(),
            FieldDef::new("user", Object(TypeName::User), blog::user),
            FieldDef::new("comments", List(TypeName::Comment), blog::comments),
            FieldDef::new("createdAt", Scalar(Float), blog::created_at),
            FieldDef::new("updatedAt", Scalar(Float), blog::updated_at),
        ],
    );

    schema.object(
        TypeName::Comment,
        vec![
            FieldDef::new("id", Scalar(Id), comment::id).non_null(),
            FieldDef::new("text", Scalar(String), comment::text).non_null(),
            FieldDef::new("date", Scalar(String), comment::date).non_null(),
            FieldDef::new("user", Object(TypeName::User), comment::user),
            FieldDef::new("blog", Object(TypeName::Blog), comment::blog),
            FieldDef::new("createdAt", Scalar(Float), comment::created_at),
            FieldDef::new("updatedAt", Scalar(Float), comment::updated_at),
        ],
    );

    schema.finish()
}

#[cfg(test)]
mod tests {
    use super::{build_schema, OutputType, TypeName};

    #[test]
    fn every_mutation_argument_is_declared() {
        let schema = build_schema().unwrap();
        let add_comment = schema
            .field(TypeName::Mutation, "addCommentToBlog")
            .unwrap();
        let names: Vec<_> = add_comment.arguments.iter().map(|arg| arg.name).collect();
        assert_eq!(names, vec!["text", "date", "user", "blog"]);
        assert_eq!(add_comment.ty, OutputType::Object(TypeName::Comment));
    }

    #[test]
    fn user_type_has_no_password_field() {
        let schema = build_schema().unwrap();
        assert!(schema.field(TypeName::User, "password").is_none());
        let sdl = schema.sdl();
        let user_block = sdl.split("type User {").nth(1).unwrap();
        let user_block = user_block.split('}').next().unwrap();
        assert!(user_block.contains("email: String!"));
        assert!(!user_block.contains("password"));
    }

    #[test]
    fn relationship_fields_point_at_object_types() {
        let schema = build_schema().unwrap();
        let comments = schema.field(TypeName::Blog, "comments").unwrap();
        assert_eq!(comments.ty, OutputType::List(TypeName::Comment));
        assert_eq!(comments.type_label(), "[Comment]");

        let users = schema.field(TypeName::Query, "users").unwrap();
        assert_eq!(users.type_label(), "[User]!");
    }

    #[test]
    fn sdl_lists_fields_in_declaration_order() {
        let sdl = build_schema().unwrap().sdl();
        let query_block = sdl.split("type Query {").nth(1).unwrap();
        let query_block = query_block.split('}').next().unwrap();
        let users_at = query_block.find("users: [User]!").unwrap();
        let comment_at = query_block.find("comment(id: ID!): Comment").unwrap();
        assert!(users_at < comment_at);
    }

    #[test]
    fn query_and_mutation_roots_are_registered() {
        let schema = build_schema().unwrap();
        let names: Vec<_> = schema
            .fields_of(TypeName::Mutation)
            .iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"deleteCommentFromBlog"));
        assert!(schema.sdl().contains("type Mutation {"));
    }
}
