//! Demo document: a blog app with posts, comments and an author
//!
//! The author may add, edit and reorder posts, and reorder comments.
//! Comments are open: anyone may add or edit them. The app itself is
//! read-only to observers.

use std::sync::Arc;

use docsync_core::capability::SelfEditable;
use docsync_core::ops::{collection_ops, model_ops};
use docsync_core::{
    Attributes, CollectionType, ModelType, NodeRef, Registry, Requester, Result, TypeTag,
};

struct Comment;

impl ModelType for Comment {
    fn type_name(&self) -> &'static str {
        "comment"
    }

    fn required(&self) -> &[(&'static str, TypeTag)] {
        &[("subject", TypeTag::String)]
    }

    fn client_editable(&self) -> &[&'static str] {
        &["subject", "body", "pinned"]
    }

    // open to everyone
    fn can_edit(&self, _: &Registry, _: NodeRef, _: &Requester) -> bool {
        true
    }
}

struct Comments;

impl CollectionType for Comments {
    fn type_name(&self) -> &'static str {
        "comments"
    }

    fn element_type(&self) -> Arc<dyn ModelType> {
        Arc::new(Comment)
    }

    fn radio_attributes(&self) -> &[&'static str] {
        &["pinned"]
    }

    fn can_add(&self, registry: &Registry, this: NodeRef, _requester: &Requester) -> bool {
        registry.owning_model(this).is_some()
    }

    fn can_move(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        registry
            .owning_model(this)
            .and_then(|post| post_author(registry, post))
            .is_some_and(|author| requester.is_node(registry, author))
    }
}

struct Post;

impl ModelType for Post {
    fn type_name(&self) -> &'static str {
        "post"
    }

    fn required(&self) -> &[(&'static str, TypeTag)] {
        &[("title", TypeTag::String), ("published", TypeTag::Date)]
    }

    fn client_editable(&self) -> &[&'static str] {
        &["title", "body", "published"]
    }

    fn initialize(&self, registry: &mut Registry, this: NodeRef) -> Result<()> {
        model_ops::add_child_collection(registry, this, "comments", Arc::new(Comments))?;
        Ok(())
    }

    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        post_author(registry, this).is_some_and(|author| requester.is_node(registry, author))
    }
}

struct Posts;

impl CollectionType for Posts {
    fn type_name(&self) -> &'static str {
        "posts"
    }

    fn element_type(&self) -> Arc<dyn ModelType> {
        Arc::new(Post)
    }

    fn can_add(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        app_author(registry, this).is_some_and(|author| requester.is_node(registry, author))
    }

    fn can_move(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        self.can_add(registry, this, requester)
    }
}

struct App;

impl ModelType for App {
    fn type_name(&self) -> &'static str {
        "app"
    }

    fn initialize(&self, registry: &mut Registry, this: NodeRef) -> Result<()> {
        model_ops::add_child_collection(registry, this, "posts", Arc::new(Posts))?;
        model_ops::add_child_model(registry, this, "author", person(), Attributes::new())?;
        Ok(())
    }

    fn can_edit(&self, _: &Registry, _: NodeRef, _: &Requester) -> bool {
        false
    }
}

fn person() -> Arc<dyn ModelType> {
    Arc::new(SelfEditable {
        type_name: "person",
    })
}

fn post_author(registry: &Registry, post: NodeRef) -> Option<NodeRef> {
    app_author(registry, registry.owning_collection(post)?)
}

fn app_author(registry: &Registry, posts: NodeRef) -> Option<NodeRef> {
    let app = registry.owning_model(posts)?;
    registry.child_model(app, "author")
}

/// Handles into a blog tree
#[derive(Debug, Clone, Copy)]
pub struct Blog {
    pub app: NodeRef,
    pub posts: NodeRef,
    pub author: NodeRef,
}

/// An app with no posts and an anonymous author
///
/// # Errors
/// * anything model creation returns
pub fn empty(registry: &mut Registry) -> Result<Blog> {
    let app = model_ops::create_model(registry, Arc::new(App), Attributes::new())?;
    let (Some(posts), Some(author)) = (
        registry.child_collection(app, "posts"),
        registry.child_model(app, "author"),
    ) else {
        return Err(docsync_core::DocSyncError::Internal {
            message: "app initializer did not declare its children".to_string(),
        });
    };
    Ok(Blog { app, posts, author })
}

/// The demo content: a named author, one post, one comment on it
///
/// # Errors
/// * anything model creation returns
pub fn build(registry: &mut Registry) -> Result<Blog> {
    let blog = empty(registry)?;
    model_ops::set_attribute(registry, blog.author, "name", "henrik")?;
    let post = collection_ops::add_new(
        registry,
        blog.posts,
        Attributes::new()
            .with("title", "Hello world")
            .with("published", "2024-01-01T00:00:00Z"),
    )?;
    if let Some(comments) = registry.child_collection(post, "comments") {
        collection_ops::add_new(
            registry,
            comments,
            Attributes::new()
                .with("subject", "first")
                .with("body", "something else"),
        )?;
    }
    Ok(blog)
}

/// Resolve a requester name: `author` is the blog's author, anything else
/// is a new person outside the tree
///
/// # Errors
/// * anything model creation returns
pub fn requester(registry: &mut Registry, blog: &Blog, name: &str) -> Result<Requester> {
    let node = if name == "author" {
        blog.author
    } else {
        model_ops::create_model(registry, person(), Attributes::new().with("name", name))?
    };
    Requester::for_node(registry, node).ok_or_else(|| docsync_core::DocSyncError::Internal {
        message: format!("requester {name} has no identifier"),
    })
}
