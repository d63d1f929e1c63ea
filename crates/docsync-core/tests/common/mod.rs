//! Shared blog fixture: an app with a `posts` collection (each post holding
//! a `comments` collection) and an `author` child model.

use std::sync::Arc;

use docsync_core::ops::{collection_ops, model_ops};
use docsync_core::{
    Attributes, CollectionType, ModelType, NodeRef, Registry, Requester, Result, TypeTag,
};

pub struct Person;

impl ModelType for Person {
    fn type_name(&self) -> &'static str {
        "person"
    }

    fn exposed_methods(&self) -> &[&'static str] {
        &["dance"]
    }

    fn call(&self, method: &str, registry: &mut Registry, this: NodeRef) -> Result<()> {
        match method {
            "dance" => model_ops::set_attribute(registry, this, "bodyMovin", "dancin'").map(|_| ()),
            "stopDancing" => {
                model_ops::set_attribute(registry, this, "bodyMovin", "stopped").map(|_| ())
            }
            _ => Err(docsync_core::DocSyncError::UnknownMethod {
                type_name: self.type_name().to_string(),
                method: method.to_string(),
            }),
        }
    }

    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        requester.is_node(registry, this)
    }
}

pub struct Comment;

impl ModelType for Comment {
    fn type_name(&self) -> &'static str {
        "comment"
    }

    fn client_editable(&self) -> &[&'static str] {
        &["subject", "body", "pinned"]
    }

    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        registry
            .owning_collection(this)
            .and_then(|comments| registry.owning_model(comments))
            .and_then(|post| author_of_post(registry, post))
            .is_some_and(|author| requester.is_node(registry, author))
    }
}

pub struct Comments;

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
        // anyone may comment on a published post
        registry.owning_model(this).is_some()
    }

    fn can_move(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        registry
            .owning_model(this)
            .and_then(|post| author_of_post(registry, post))
            .is_some_and(|author| requester.is_node(registry, author))
    }
}

pub struct Post;

impl ModelType for Post {
    fn type_name(&self) -> &'static str {
        "post"
    }

    fn required(&self) -> &[(&'static str, TypeTag)] {
        &[("title", TypeTag::String)]
    }

    fn client_editable(&self) -> &[&'static str] {
        &["title"]
    }

    fn initialize(&self, registry: &mut Registry, this: NodeRef) -> Result<()> {
        model_ops::add_child_collection(registry, this, "comments", Arc::new(Comments))?;
        Ok(())
    }

    fn can_edit(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        author_of_post(registry, this).is_some_and(|author| requester.is_node(registry, author))
    }
}

pub struct Posts;

impl CollectionType for Posts {
    fn type_name(&self) -> &'static str {
        "posts"
    }

    fn element_type(&self) -> Arc<dyn ModelType> {
        Arc::new(Post)
    }

    fn can_add(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        author_of_app(registry, this).is_some_and(|author| requester.is_node(registry, author))
    }

    fn can_move(&self, registry: &Registry, this: NodeRef, requester: &Requester) -> bool {
        self.can_add(registry, this, requester)
    }
}

pub struct App;

impl ModelType for App {
    fn type_name(&self) -> &'static str {
        "app"
    }

    fn initialize(&self, registry: &mut Registry, this: NodeRef) -> Result<()> {
        model_ops::add_child_collection(registry, this, "posts", Arc::new(Posts))?;
        model_ops::add_child_model(registry, this, "author", Arc::new(Person), Attributes::new())?;
        Ok(())
    }

    fn can_edit(&self, _: &Registry, _: NodeRef, _: &Requester) -> bool {
        false
    }
}

/// Author of the app holding `post`, following the post's collection
fn author_of_post(registry: &Registry, post: NodeRef) -> Option<NodeRef> {
    let posts = registry.owning_collection(post)?;
    author_of_app(registry, posts)
}

fn author_of_app(registry: &Registry, posts: NodeRef) -> Option<NodeRef> {
    let app = registry.owning_model(posts)?;
    registry.child_model(app, "author")
}

/// Handles into a blog tree
#[allow(dead_code)]
pub struct Blog {
    pub app: NodeRef,
    pub posts: NodeRef,
    pub author: NodeRef,
}

#[allow(dead_code)]
impl Blog {
    pub fn first_post(&self, registry: &Registry) -> NodeRef {
        registry.items(self.posts).unwrap()[0]
    }

    pub fn comments_of(&self, registry: &Registry, post: NodeRef) -> NodeRef {
        registry.child_collection(post, "comments").unwrap()
    }

    pub fn author_requester(&self, registry: &Registry) -> Requester {
        Requester::for_node(registry, self.author).unwrap()
    }
}

/// Empty app: no posts, anonymous author
#[allow(dead_code)]
pub fn new_app(registry: &mut Registry) -> Blog {
    let app = model_ops::create_model(registry, Arc::new(App), Attributes::new()).unwrap();
    Blog {
        app,
        posts: registry.child_collection(app, "posts").unwrap(),
        author: registry.child_model(app, "author").unwrap(),
    }
}

/// App with a named author, one post, and one comment on it
#[allow(dead_code)]
pub fn get_app(registry: &mut Registry) -> Blog {
    let blog = new_app(registry);
    model_ops::set_attribute(registry, blog.author, "name", "henrik").unwrap();
    let post = collection_ops::add_new(
        registry,
        blog.posts,
        Attributes::new().with("title", "some post"),
    )
    .unwrap();
    let comments = blog.comments_of(registry, post);
    collection_ops::add_new(
        registry,
        comments,
        Attributes::new()
            .with("subject", "first")
            .with("body", "something else"),
    )
    .unwrap();
    blog
}

/// A person outside the tree, usable as an unrelated requester
#[allow(dead_code)]
pub fn stranger(registry: &mut Registry, name: &str) -> Requester {
    let person = model_ops::create_model(
        registry,
        Arc::new(Person),
        Attributes::new().with("name", name),
    )
    .unwrap();
    Requester::for_node(registry, person).unwrap()
}

/// Add a post titled `title` as the trusted side
#[allow(dead_code)]
pub fn add_post(registry: &mut Registry, blog: &Blog, title: &str) -> NodeRef {
    collection_ops::add_new(registry, blog.posts, Attributes::new().with("title", title)).unwrap()
}

/// Add a comment with `subject` to `post` as the trusted side
#[allow(dead_code)]
pub fn add_comment(registry: &mut Registry, blog: &Blog, post: NodeRef, subject: &str) -> NodeRef {
    let comments = blog.comments_of(registry, post);
    collection_ops::add_new(registry, comments, Attributes::new().with("subject", subject)).unwrap()
}
