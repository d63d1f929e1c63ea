mod common;

use common::*;
use docsync_core::docsync_core_types::RequestContext;
use docsync_core::{
    apply_command, Attributes, Command, Denial, DenialKind, DocSyncError, IgnoreDenials, Outbox,
    PublishMessage, Registry,
};
use serde_json::json;

fn ctx() -> RequestContext {
    RequestContext::new()
}

#[test]
fn test_wire_set_from_author_is_applied_and_published() {
    // GIVEN a set command as it arrives on the wire
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post = blog.first_post(&reg);
    let post_id = reg.identifier(post).cloned().unwrap();
    let outbox = Outbox::attach(&mut reg, blog.app).unwrap();
    let wire = json!({"event": "set", "id": post_id.as_str(), "change": {"title": "renamed"}});
    let command: Command = serde_json::from_value(wire).unwrap();

    // WHEN the author sends it
    let author = blog.author_requester(&reg);
    let mut denials: Vec<Denial> = Vec::new();
    let applied = apply_command(
        &mut reg,
        &command,
        &author,
        &mut denials,
        &ctx(),
    )
    .unwrap();

    // THEN it is applied, published, and nothing is denied
    assert!(applied);
    assert!(denials.is_empty());
    assert_eq!(reg.attributes(post).unwrap().get("title"), Some(&json!("renamed")));
    assert!(matches!(
        outbox.last(),
        Some(PublishMessage::Change { id: Some(id), .. }) if id == post_id
    ));
}

#[test]
fn test_unknown_identifier_is_an_error() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let author = blog.author_requester(&reg);

    let err = apply_command(
        &mut reg,
        &Command::set("missing", Attributes::new().with("title", "x")),
        &author,
        &mut IgnoreDenials,
        &ctx(),
    )
    .unwrap_err();

    assert!(matches!(err, DocSyncError::NodeNotFound { id } if id == "missing"));
}

#[test]
fn test_stranger_commands_are_denied() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post = blog.first_post(&reg);
    let post_id = reg.identifier(post).cloned().unwrap();
    let posts_id = reg.identifier(blog.posts).cloned().unwrap();
    let mallory = stranger(&mut reg, "mallory");
    let outbox = Outbox::attach(&mut reg, blog.app).unwrap();

    let commands = vec![
        Command::set(post_id.clone(), Attributes::new().with("title", "pwned")),
        Command::delete(post_id.clone()),
        Command::add(posts_id.clone(), Attributes::new().with("title", "spam")),
        Command::move_item(posts_id, post_id, 0),
    ];
    let mut denials: Vec<Denial> = Vec::new();
    for command in &commands {
        let applied = apply_command(&mut reg, command, &mallory, &mut denials, &ctx()).unwrap();
        assert!(!applied);
    }

    let kinds: Vec<DenialKind> = denials.iter().map(Denial::kind).collect();
    assert_eq!(
        kinds,
        vec![
            DenialKind::Set,
            DenialKind::Delete,
            DenialKind::Add,
            DenialKind::Move
        ]
    );
    assert!(outbox.is_empty());
    assert_eq!(reg.items(blog.posts).unwrap(), &[post]);
}

#[test]
fn test_add_command_on_model_is_wrong_kind() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post_id = reg.identifier(blog.first_post(&reg)).cloned().unwrap();
    let author = blog.author_requester(&reg);

    let err = apply_command(
        &mut reg,
        &Command::add(post_id, Attributes::new().with("title", "x")),
        &author,
        &mut IgnoreDenials,
        &ctx(),
    )
    .unwrap_err();

    assert!(matches!(err, DocSyncError::WrongNodeKind { .. }));
}

#[test]
fn test_comment_added_by_anyone_then_pinned_by_author() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post = blog.first_post(&reg);
    let comments = blog.comments_of(&reg, post);
    let comments_id = reg.identifier(comments).cloned().unwrap();
    let reader = stranger(&mut reg, "reader");

    let added = apply_command(
        &mut reg,
        &Command::add(comments_id, Attributes::new().with("subject", "nice post")),
        &reader,
        &mut IgnoreDenials,
        &ctx(),
    )
    .unwrap();
    assert!(added);
    let fresh = reg.items(comments).unwrap()[1];

    // the reader does not own the post, so toggling is refused
    let toggle = Command::toggle(&reg, fresh, "pinned").unwrap();
    let mut denials: Vec<Denial> = Vec::new();
    assert!(!apply_command(&mut reg, &toggle, &reader, &mut denials, &ctx()).unwrap());
    assert_eq!(denials.len(), 1);

    let author = blog.author_requester(&reg);
    assert!(apply_command(&mut reg, &toggle, &author, &mut denials, &ctx()).unwrap());
    assert_eq!(reg.attributes(fresh).unwrap().get("pinned"), Some(&json!(true)));
}

#[test]
fn test_method_command_runs_only_exposed_methods() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let author_id = reg.identifier(blog.author).cloned().unwrap();
    let author = blog.author_requester(&reg);
    let mut denials: Vec<Denial> = Vec::new();

    let danced = apply_command(
        &mut reg,
        &Command::method(author_id.clone(), "dance"),
        &author,
        &mut denials,
        &ctx(),
    )
    .unwrap();
    let stopped = apply_command(
        &mut reg,
        &Command::method(author_id, "stopDancing"),
        &author,
        &mut denials,
        &ctx(),
    )
    .unwrap();

    assert!(danced);
    assert!(!stopped);
    assert_eq!(
        reg.attributes(blog.author).unwrap().get("bodyMovin"),
        Some(&json!("dancin'"))
    );
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].kind(), DenialKind::Call);
}

#[test]
fn test_unset_command() {
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post = blog.first_post(&reg);
    let comment = reg.items(blog.comments_of(&reg, post)).unwrap()[0];
    let comment_id = reg.identifier(comment).cloned().unwrap();
    let command: Command = serde_json::from_value(json!({
        "event": "unset",
        "id": comment_id.as_str(),
        "property": "body"
    }))
    .unwrap();
    let author = blog.author_requester(&reg);

    let applied = apply_command(
        &mut reg,
        &command,
        &author,
        &mut IgnoreDenials,
        &ctx(),
    )
    .unwrap();

    assert!(applied);
    assert!(reg.attributes(comment).unwrap().get("body").is_none());
}
