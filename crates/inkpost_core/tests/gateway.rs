use inkpost_core::db::Database;
use inkpost_core::gateway::{
    build_schema, execute_request, ExecutionPolicy, GraphRequest, GraphResponse, Schema,
    MAX_SELECTION_DEPTH,
};
use inkpost_core::service::credentials::{BcryptHasher, PasswordHasher};
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    db: Database,
    hasher: Arc<dyn PasswordHasher>,
    schema: Schema,
}

impl Harness {
    fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            hasher: Arc::new(BcryptHasher::try_new(4).unwrap()),
            schema: build_schema().unwrap(),
        }
    }

    fn run(&self, request: GraphRequest) -> GraphResponse {
        self.run_with(request, ExecutionPolicy::default())
    }

    fn run_with(&self, request: GraphRequest, policy: ExecutionPolicy) -> GraphResponse {
        execute_request(&self.db, self.hasher.clone(), &self.schema, &request, policy).unwrap()
    }

    fn user_count(&self) -> i64 {
        self.db
            .with_connection(|conn| conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0)))
            .unwrap()
            .unwrap()
    }

    fn data(&self, query: &str, variables: Value) -> Value {
        let response = self.run(GraphRequest::new(query).with_variables(variables));
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.unwrap()
    }

    fn sign_up(&self, email: &str) -> String {
        let data = self.data(
            "mutation Join($email: String!) {
                signUp(name: \"Ada\", email: $email, password: \"secret\") { id }
            }",
            json!({ "email": email }),
        );
        data["signUp"]["id"].as_str().unwrap().to_string()
    }

    fn add_blog(&self, user: &str, title: &str) -> String {
        let data = self.data(
            "mutation Post($user: ID!, $title: String!) {
                addBlog(title: $title, content: \"body\", date: \"2024-01-01\", user: $user) { id }
            }",
            json!({ "user": user, "title": title }),
        );
        data["addBlog"]["id"].as_str().unwrap().to_string()
    }

    fn add_comment(&self, user: &str, blog: &str, text: &str) -> String {
        let data = self.data(
            "mutation Reply($user: ID!, $blog: ID!, $text: String!) {
                addCommentToBlog(text: $text, date: \"2024-01-02\", user: $user, blog: $blog) { id }
            }",
            json!({ "user": user, "blog": blog, "text": text }),
        );
        data["addCommentToBlog"]["id"].as_str().unwrap().to_string()
    }
}

#[test]
fn nested_relationships_resolve_through_owning_fields() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");
    let grace = harness.sign_up("grace@example.com");
    let post = harness.add_blog(&ada, "hello");
    harness.add_comment(&grace, &post, "first!");

    let data = harness.data(
        "{ users { email blogs { title comments { text user { email } } } comments { text } } }",
        json!(null),
    );
    assert_eq!(
        data,
        json!({
            "users": [
                {
                    "email": "ada@example.com",
                    "blogs": [
                        {
                            "title": "hello",
                            "comments": [
                                { "text": "first!", "user": { "email": "grace@example.com" } }
                            ]
                        }
                    ],
                    "comments": []
                },
                {
                    "email": "grace@example.com",
                    "blogs": [],
                    "comments": [ { "text": "first!" } ]
                }
            ]
        })
    );
}

#[test]
fn aliases_and_typename() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");
    let post = harness.add_blog(&ada, "hello");

    let data = harness.data(
        "query Pick($id: ID!) { post: blog(id: $id) { kind: __typename heading: title owner: user { __typename } } }",
        json!({ "id": post }),
    );
    assert_eq!(
        data,
        json!({ "post": { "kind": "Blog", "heading": "hello", "owner": { "__typename": "User" } } })
    );
}

#[test]
fn unknown_id_resolves_to_null() {
    let harness = Harness::new();
    let data = harness.data(
        "{ blog(id: \"7f1b0c9e-3d2a-4c55-9a61-0d2b5f0a9e11\") { id } }",
        json!(null),
    );
    assert_eq!(data, json!({ "blog": null }));
}

#[test]
fn field_errors_do_not_block_siblings() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");

    let response = harness.run(GraphRequest::new(format!(
        "mutation {{
            broken: addBlog(title: \"t\", content: \"c\", date: \"d\", user: \"7f1b0c9e-3d2a-4c55-9a61-0d2b5f0a9e11\") {{ id }}
            fine: addBlog(title: \"ok\", content: \"c\", date: \"d\", user: \"{ada}\") {{ title }}
        }}"
    )));

    assert!(!response.is_rejected());
    let data = response.data.unwrap();
    assert_eq!(data["broken"], json!(null));
    assert_eq!(data["fine"], json!({ "title": "ok" }));

    assert_eq!(response.errors.len(), 1);
    let error = serde_json::to_value(&response.errors[0]).unwrap();
    assert_eq!(error["path"], json!(["broken"]));
    assert_eq!(error["extensions"]["code"], json!("USER_NOT_FOUND"));
}

#[test]
fn nested_field_error_carries_list_index_in_path() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");
    let post = harness.add_blog(&ada, "doomed");
    let comment = harness.add_comment(&ada, &post, "orphan");

    harness.data(
        "mutation Drop($id: ID!) { deleteBlog(id: $id) { id } }",
        json!({ "id": post }),
    );

    let data = harness.data("{ comments { id blog { title } } }", json!(null));
    assert_eq!(data, json!({ "comments": [ { "id": comment, "blog": null } ] }));

    let response = harness.run(
        GraphRequest::new("mutation Remove($id: ID!) { deleteCommentFromBlog(id: $id) { id } }")
            .with_variables(json!({ "id": comment })),
    );
    assert_eq!(response.errors[0].code(), "BLOG_NOT_FOUND");
    assert_eq!(response.data.unwrap(), json!({ "deleteCommentFromBlog": null }));
}

#[test]
fn missing_mandatory_argument_rejects_the_document() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");

    let response = harness.run(GraphRequest::new(format!(
        "mutation {{
            first: addBlog(title: \"a\", content: \"c\", date: \"d\", user: \"{ada}\") {{ id }}
            second: addBlog(title: \"b\", content: \"c\", user: \"{ada}\") {{ id }}
        }}"
    )));

    assert!(response.is_rejected());
    assert_eq!(response.data, None);
    assert_eq!(response.errors[0].code(), "GRAPHQL_VALIDATION_FAILED");

    let data = harness.data("{ blogs { id } }", json!(null));
    assert_eq!(data, json!({ "blogs": [] }));
}

#[test]
fn password_is_not_selectable() {
    let harness = Harness::new();
    harness.sign_up("ada@example.com");

    let response = harness.run(GraphRequest::new("{ users { email password } }"));
    assert!(response.is_rejected());
    assert!(response.errors[0].message.contains("password"));
}

#[test]
fn login_through_gateway() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");

    let data = harness.data(
        "mutation { login(email: \"ada@example.com\", password: \"secret\") { id name } }",
        json!(null),
    );
    assert_eq!(data, json!({ "login": { "id": ada, "name": "Ada" } }));

    let response = harness.run(GraphRequest::new(
        "mutation { login(email: \"ada@example.com\", password: \"nope\") { id } }",
    ));
    assert_eq!(response.errors[0].code(), "INVALID_CREDENTIALS");
}

#[test]
fn malformed_id_argument_is_a_field_validation_error() {
    let harness = Harness::new();
    let response = harness.run(GraphRequest::new("{ blog(id: \"not-a-uuid\") { id } }"));

    assert!(!response.is_rejected());
    assert_eq!(response.errors[0].code(), "VALIDATION_ERROR");
    assert_eq!(response.data.unwrap(), json!({ "blog": null }));
}

#[test]
fn syntax_error_is_rejected_with_location() {
    let harness = Harness::new();
    let response = harness.run(GraphRequest::new("{ users { id "));

    assert!(response.is_rejected());
    let error = serde_json::to_value(&response.errors[0]).unwrap();
    assert_eq!(error["extensions"]["code"], json!("GRAPHQL_PARSE_FAILED"));
    assert_eq!(error["locations"][0]["line"], json!(1));
}

#[test]
fn operation_name_selects_among_several() {
    let harness = Harness::new();
    harness.sign_up("ada@example.com");
    let document = "query Users { users { email } } query Blogs { blogs { id } }";

    let response = harness.run(GraphRequest::new(document));
    assert!(response.is_rejected());

    let response = harness.run(GraphRequest::new(document).with_operation_name("Users"));
    assert_eq!(
        response.data.unwrap(),
        json!({ "users": [ { "email": "ada@example.com" } ] })
    );
}

#[test]
fn read_only_policy_refuses_mutations() {
    let harness = Harness::new();
    let response = harness.run_with(
        GraphRequest::new(
            "mutation { signUp(name: \"a\", email: \"b\", password: \"c\") { id } }",
        ),
        ExecutionPolicy::read_only(),
    );
    assert!(response.is_rejected());
    assert_eq!(response.errors[0].code(), "MUTATION_NOT_ALLOWED");

    let data = harness.data("{ users { id } }", json!(null));
    assert_eq!(data, json!({ "users": [] }));
}

#[test]
fn update_blog_round_trip_and_idempotent_reads() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");
    let post = harness.add_blog(&ada, "draft");

    harness.data(
        "mutation Edit($id: ID!) { updateBlog(id: $id, title: \"final\", content: \"c2\", date: \"2024-05-05\") { id } }",
        json!({ "id": post }),
    );

    let query = "query One($id: ID!) { blog(id: $id) { title content date createdAt updatedAt } }";
    let first = harness.data(query, json!({ "id": post }));
    let second = harness.data(query, json!({ "id": post }));
    assert_eq!(first, second);
    assert_eq!(first["blog"]["title"], json!("final"));
    assert!(first["blog"]["createdAt"].is_i64());
}

#[test]
fn conflicting_response_keys_reject_the_whole_document() {
    let harness = Harness::new();

    let response = harness.run(GraphRequest::new(
        "mutation {
            a: signUp(name: \"Ada\", email: \"ada@example.com\", password: \"p\") { id }
            a: signUp(name: \"Grace\", email: \"grace@example.com\", password: \"p\") { id }
        }",
    ));

    assert!(response.is_rejected());
    assert_eq!(response.errors[0].code(), "GRAPHQL_VALIDATION_FAILED");
    assert_eq!(response.errors[0].locations.len(), 2);
    assert_eq!(harness.user_count(), 0);
}

#[test]
fn deeply_nested_literal_is_a_parse_failure() {
    let harness = Harness::new();
    let query = format!(
        "{{ blog(id: {}{}) {{ id }} }}",
        "[".repeat(100_000),
        "]".repeat(100_000)
    );

    let response = harness.run(GraphRequest::new(query));
    assert!(response.is_rejected());
    assert_eq!(response.errors[0].code(), "GRAPHQL_PARSE_FAILED");
}

#[test]
fn selections_deeper_than_the_limit_are_rejected() {
    let harness = Harness::new();
    let mut query = String::from("{ blogs { id } }");
    for _ in 0..=MAX_SELECTION_DEPTH / 2 {
        query = query.replacen("{ id }", "{ user { blogs { id } } }", 1);
    }

    let response = harness.run(GraphRequest::new(query));
    assert!(response.is_rejected());
    assert_eq!(response.errors[0].code(), "GRAPHQL_VALIDATION_FAILED");
}

#[test]
fn fragments_expand_into_the_selection() {
    let harness = Harness::new();
    harness.sign_up("ada@example.com");

    let data = harness.data(
        "query { users { ...Card ... on User { name } } } fragment Card on User { email }",
        json!(null),
    );
    assert_eq!(
        data,
        json!({ "users": [ { "email": "ada@example.com", "name": "Ada" } ] })
    );
}

#[test]
fn variable_type_must_match_the_argument() {
    let harness = Harness::new();
    let ada = harness.sign_up("ada@example.com");

    let response = harness.run(
        GraphRequest::new("query One($id: String!) { user(id: $id) { id } }")
            .with_variables(json!({ "id": ada })),
    );
    assert!(response.is_rejected());
    assert_eq!(response.errors[0].code(), "GRAPHQL_VALIDATION_FAILED");
}
