use inkpost_core::db::open_db_in_memory;
use inkpost_core::model::blog::{Blog, BlogEdit, NewBlog};
use inkpost_core::model::comment::{Comment, NewComment};
use inkpost_core::model::entity::{EntityKind, Ref};
use inkpost_core::model::user::User;
use inkpost_core::repo::blog_repo::{BlogRepository, SqliteBlogRepository};
use inkpost_core::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use inkpost_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use inkpost_core::service::coordinator::{ConsistencyCoordinator, SignUpRequest};
use inkpost_core::service::credentials::BcryptHasher;
use inkpost_core::service::error::{ErrorKind, LookupKey, ServiceError};
use rusqlite::Connection;
use uuid::Uuid;

fn hasher() -> BcryptHasher {
    BcryptHasher::try_new(4).unwrap()
}

fn sign_up(coordinator: &ConsistencyCoordinator<'_>, email: &str) -> User {
    coordinator
        .sign_up(&SignUpRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        })
        .unwrap()
}

fn add_blog(coordinator: &ConsistencyCoordinator<'_>, owner: &User, title: &str) -> Blog {
    coordinator
        .add_blog(&NewBlog {
            title: title.to_string(),
            content: "body".to_string(),
            date: "2024-01-01".to_string(),
            user: Ref::to(owner),
        })
        .unwrap()
}

fn new_comment(author: &User, blog: &Blog, text: &str) -> NewComment {
    NewComment {
        text: text.to_string(),
        date: "2024-01-02".to_string(),
        user: Ref::to(author),
        blog: Ref::to(blog),
    }
}

fn reload_user(conn: &Connection, user: &User) -> User {
    SqliteUserRepository::new(conn)
        .get_user(user.id)
        .unwrap()
        .unwrap()
}

fn reload_blog(conn: &Connection, blog: &Blog) -> Option<Blog> {
    SqliteBlogRepository::new(conn).get_blog(blog.id).unwrap()
}

fn find_comment(conn: &Connection, comment: &Comment) -> Option<Comment> {
    SqliteCommentRepository::new(conn)
        .get_comment(comment.id)
        .unwrap()
}

#[test]
fn add_blog_appends_to_owner() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let owner = sign_up(&coordinator, "ada@example.com");

    let first = add_blog(&coordinator, &owner, "first");
    let second = add_blog(&coordinator, &owner, "second");

    assert_eq!(first.user, Ref::to(&owner));
    let owner = reload_user(&conn, &owner);
    assert_eq!(owner.blogs, vec![Ref::to(&first), Ref::to(&second)]);
}

#[test]
fn add_blog_for_missing_user_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let ghost = Uuid::new_v4();

    let err = coordinator
        .add_blog(&NewBlog {
            title: "t".to_string(),
            content: "c".to_string(),
            date: "d".to_string(),
            user: Ref::new(ghost),
        })
        .unwrap_err();

    assert_eq!(err.code(), "USER_NOT_FOUND");
    assert!(SqliteBlogRepository::new(&conn)
        .list_blogs()
        .unwrap()
        .is_empty());
}

#[test]
fn add_blog_rejects_blank_fields() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let owner = sign_up(&coordinator, "ada@example.com");

    let err = coordinator
        .add_blog(&NewBlog {
            title: String::new(),
            content: "c".to_string(),
            date: "d".to_string(),
            user: Ref::to(&owner),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(reload_user(&conn, &owner).blogs.is_empty());
}

#[test]
fn add_comment_keeps_both_lists_symmetric() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let reader = sign_up(&coordinator, "grace@example.com");
    let blog = add_blog(&coordinator, &author, "post");

    let first = coordinator
        .add_comment(&new_comment(&reader, &blog, "nice"))
        .unwrap();
    let second = coordinator
        .add_comment(&new_comment(&author, &blog, "thanks"))
        .unwrap();

    let blog = reload_blog(&conn, &blog).unwrap();
    assert_eq!(blog.comments, vec![Ref::to(&first), Ref::to(&second)]);
    assert_eq!(reload_user(&conn, &reader).comments, vec![Ref::to(&first)]);
    assert_eq!(reload_user(&conn, &author).comments, vec![Ref::to(&second)]);
}

#[test]
fn add_comment_checks_user_before_blog() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);

    let err = coordinator
        .add_comment(&NewComment {
            text: "t".to_string(),
            date: "d".to_string(),
            user: Ref::new(Uuid::new_v4()),
            blog: Ref::new(Uuid::new_v4()),
        })
        .unwrap_err();
    assert_eq!(err.code(), "USER_NOT_FOUND");

    let author = sign_up(&coordinator, "ada@example.com");
    let err = coordinator
        .add_comment(&NewComment {
            text: "t".to_string(),
            date: "d".to_string(),
            user: Ref::to(&author),
            blog: Ref::new(Uuid::new_v4()),
        })
        .unwrap_err();
    assert_eq!(err.code(), "BLOG_NOT_FOUND");
    assert!(reload_user(&conn, &author).comments.is_empty());
}

#[test]
fn failure_while_appending_to_blog_rolls_back_the_comment() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "post");

    conn.execute_batch(
        "CREATE TRIGGER reject_blog_comment_append
         BEFORE UPDATE OF comment_ids ON blogs
         BEGIN
             SELECT RAISE(ABORT, 'injected store failure');
         END;",
    )
    .unwrap();

    let err = coordinator
        .add_comment(&new_comment(&author, &blog, "lost"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert_eq!(err.code(), "TRANSACTION_ERROR");

    assert!(SqliteCommentRepository::new(&conn)
        .list_comments()
        .unwrap()
        .is_empty());
    assert!(reload_user(&conn, &author).comments.is_empty());
    assert!(reload_blog(&conn, &blog).unwrap().comments.is_empty());
}

#[test]
fn delete_comment_cascades_to_both_lists() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "post");
    let keep = coordinator
        .add_comment(&new_comment(&author, &blog, "keep"))
        .unwrap();
    let removed = coordinator
        .add_comment(&new_comment(&author, &blog, "remove"))
        .unwrap();

    let deleted = coordinator.delete_comment(removed.id).unwrap();
    assert_eq!(deleted.id, removed.id);

    assert_eq!(find_comment(&conn, &removed), None);
    assert_eq!(reload_user(&conn, &author).comments, vec![Ref::to(&keep)]);
    assert_eq!(
        reload_blog(&conn, &blog).unwrap().comments,
        vec![Ref::to(&keep)]
    );

    let err = coordinator.delete_comment(removed.id).unwrap_err();
    assert_eq!(err.code(), "COMMENT_NOT_FOUND");
}

#[test]
fn delete_blog_detaches_from_owner_and_keeps_orphan_comments() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "post");
    let other = add_blog(&coordinator, &author, "other");
    let comment = coordinator
        .add_comment(&new_comment(&author, &blog, "orphan-to-be"))
        .unwrap();

    let deleted = coordinator.delete_blog(blog.id).unwrap();
    assert_eq!(deleted.id, blog.id);
    assert_eq!(reload_blog(&conn, &blog), None);
    assert_eq!(reload_user(&conn, &author).blogs, vec![Ref::to(&other)]);

    let orphan = find_comment(&conn, &comment).unwrap();
    assert_eq!(orphan.blog, Ref::to(&blog));
    assert_eq!(reload_user(&conn, &author).comments, vec![Ref::to(&comment)]);

    let err = coordinator.delete_comment(comment.id).unwrap_err();
    assert_eq!(err.code(), "BLOG_NOT_FOUND");
    assert!(find_comment(&conn, &comment).is_some());
}

#[test]
fn delete_blog_with_missing_owner_fails_without_deleting() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "post");
    SqliteUserRepository::new(&conn)
        .delete_user(author.id)
        .unwrap();

    let err = coordinator.delete_blog(blog.id).unwrap_err();
    assert!(matches!(err, ServiceError::OwnerMissing { .. }));
    assert_eq!(err.code(), "OWNER_MISSING");
    assert!(reload_blog(&conn, &blog).is_some());

    let err = coordinator.delete_blog(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.code(), "BLOG_NOT_FOUND");
}

#[test]
fn update_blog_changes_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "draft");
    let comment = coordinator
        .add_comment(&new_comment(&author, &blog, "hi"))
        .unwrap();

    let updated = coordinator
        .update_blog(
            blog.id,
            &BlogEdit {
                title: "final".to_string(),
                content: "polished".to_string(),
                date: "2024-03-01".to_string(),
            },
        )
        .unwrap();
    assert_eq!(updated.title, "final");
    assert_eq!(updated.user, Ref::to(&author));
    assert_eq!(updated.comments, vec![Ref::to(&comment)]);

    let err = coordinator
        .update_blog(
            Uuid::new_v4(),
            &BlogEdit {
                title: "x".to_string(),
                content: "y".to_string(),
                date: "z".to_string(),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "BLOG_NOT_FOUND");
}

#[test]
fn reads_are_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let author = sign_up(&coordinator, "ada@example.com");
    let blog = add_blog(&coordinator, &author, "post");

    assert_eq!(reload_blog(&conn, &blog), reload_blog(&conn, &blog));
}

#[test]
fn duplicate_email_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    sign_up(&coordinator, "ada@example.com");

    let err = coordinator
        .sign_up(&SignUpRequest {
            name: "Impostor".to_string(),
            email: "ada@example.com".to_string(),
            password: "other".to_string(),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.code(), "DUPLICATE_EMAIL");

    let matching = SqliteUserRepository::new(&conn)
        .list_users()
        .unwrap()
        .into_iter()
        .filter(|user| user.email == "ada@example.com")
        .count();
    assert_eq!(matching, 1);
}

#[test]
fn sign_up_stores_a_hash_not_the_password() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let user = sign_up(&coordinator, "ada@example.com");

    assert_ne!(user.password_hash, "correct horse");
    assert!(user.password_hash.starts_with("$2"));
}

#[test]
fn login_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let hasher = hasher();
    let coordinator = ConsistencyCoordinator::new(&conn, &hasher);
    let user = sign_up(&coordinator, "ada@example.com");

    let logged_in = coordinator
        .login("ada@example.com", "correct horse")
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let err = coordinator
        .login("ada@example.com", "wrong")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.code(), "INVALID_CREDENTIALS");

    let err = coordinator
        .login("nobody@example.com", "correct horse")
        .unwrap_err();
    match err {
        ServiceError::NotFound {
            kind: EntityKind::User,
            key: LookupKey::Email(email),
        } => assert_eq!(email, "nobody@example.com"),
        other => panic!("unexpected error: {other}"),
    }
}
