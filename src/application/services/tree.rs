//! Tree service

use tracing::{debug, info};

use crate::application::views::TreeView;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{validate_name, PathId, Principal, Tree, TreeId};
use crate::infrastructure::traits::GraphTx;

use super::{authorize_write, load_path, load_tree, Store};

/// Changes to apply to a tree; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TreeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole path set
    pub paths: Option<Vec<PathId>>,
}

pub struct TreeService {
    store: Store,
}

impl TreeService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn ensure_unique(tx: &dyn GraphTx, creator: &str, name: &str) -> ApplicationResult<()> {
        if tx.find_tree(creator, name)?.is_some() {
            return Err(ApplicationError::DuplicateTreeName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn create(
        &self,
        actor: &Principal,
        name: &str,
        description: &str,
    ) -> ApplicationResult<Tree> {
        debug!("create: tree name={}", name);
        authorize_write(actor)?;
        validate_name("tree", name)?;

        let tx = self.store.write()?;
        Self::ensure_unique(&*tx, &actor.name, name)?;
        let tree = Tree::new(name, description, &actor.name);
        tx.insert_tree(&tree)?;
        tx.commit()?;

        info!(tree = %tree.id, name = %tree.name, creator = %tree.creator, "tree created");
        Ok(tree)
    }

    pub fn update(
        &self,
        actor: &Principal,
        id: TreeId,
        update: TreeUpdate,
    ) -> ApplicationResult<Tree> {
        debug!("update: tree={} {:?}", id, update);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        let mut tree = load_tree(&*tx, id)?;
        if let Some(name) = update.name {
            validate_name("tree", &name)?;
            if name != tree.name {
                Self::ensure_unique(&*tx, &tree.creator, &name)?;
            }
            tree.name = name;
        }
        if let Some(description) = update.description {
            tree.description = description;
        }
        tx.update_tree(&tree)?;

        if let Some(paths) = update.paths {
            for path in &paths {
                load_path(&*tx, *path)?;
            }
            tx.set_tree_paths(tree.id, &paths)?;
        }
        let tree = load_tree(&*tx, id)?;
        tx.commit()?;

        info!(tree = %tree.id, name = %tree.name, "tree updated");
        Ok(tree)
    }

    /// Add an existing path to the tree; adding it twice is a no-op.
    pub fn add_path(&self, actor: &Principal, tree: TreeId, path: PathId) -> ApplicationResult<()> {
        debug!("add_path: tree={} path={}", tree, path);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        load_tree(&*tx, tree)?;
        load_path(&*tx, path)?;
        tx.add_path_to_tree(tree, path)?;
        tx.commit()?;
        info!(%tree, %path, "path added to tree");
        Ok(())
    }

    /// Delete the tree. Its paths stay; they may belong to other trees.
    pub fn delete(&self, actor: &Principal, id: TreeId) -> ApplicationResult<()> {
        debug!("delete: tree={}", id);
        authorize_write(actor)?;

        let tx = self.store.write()?;
        if !tx.delete_tree(id)? {
            return Err(ApplicationError::TreeNotFound(id));
        }
        tx.commit()?;
        info!(tree = %id, "tree deleted");
        Ok(())
    }

    pub fn get(&self, id: TreeId) -> ApplicationResult<Tree> {
        let tx = self.store.read()?;
        load_tree(&*tx, id)
    }

    pub fn list(&self) -> ApplicationResult<Vec<Tree>> {
        let tx = self.store.read()?;
        Ok(tx.list_trees()?)
    }

    /// Nested view: paths, their steps and options.
    pub fn show(&self, id: TreeId) -> ApplicationResult<TreeView> {
        let tx = self.store.read()?;
        let tree = load_tree(&*tx, id)?;
        TreeView::load(&*tx, tree)
    }
}
