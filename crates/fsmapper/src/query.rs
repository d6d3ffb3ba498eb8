//! Query engine answering protocol requests against a namespace.
//!
//! [`FsMapper`] owns the namespace built at startup and serves `head`,
//! `get`, `subscribe` and `unsubscribe`. Requests are independent; the
//! namespace is shared read-only, so concurrent calls need no locking.
//! Failures never escape [`FsMapper::process`]: they become error responses.

mod stat;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use tokio::fs;

use crate::config::{MapperConfig, ALTERNATE_ENTRY_POINT, DEFAULT_ENTRY_POINT};
use crate::error::{MapperError, Result};
use crate::explore::{DirNode, TreeEntry};
use crate::namespace::Namespace;
use crate::types::{
    Command, DirStat, EntryKind, FileStat, Listing, Request, Response, Stat, StatInfo, TreeNode,
    BAD_REQUEST, NOT_FOUND,
};

use stat::{is_file, is_top_level, join_virtual, read_names, replace_virtual_name};

/// Suffixes on a `head` path that request a recursive crawl.
const CRAWL_MARKERS: [&str; 2] = ["!", ".ls"];

/// Strips a crawl marker from a `head` path.
///
/// Returns the bare path and whether a marker was present.
pub fn strip_crawl_marker(path: &str) -> (&str, bool) {
    CRAWL_MARKERS
        .iter()
        .find_map(|marker| path.strip_suffix(marker))
        .map(|bare| (if bare.is_empty() { "/" } else { bare }, true))
        .unwrap_or((path, false))
}

/// Serves protocol requests against an explored namespace.
#[derive(Debug, Clone)]
pub struct FsMapper {
    namespace: Arc<Namespace>,
    default_document: String,
    max_depth: usize,
}

impl FsMapper {
    /// Explores the configured sources once and returns the mapper.
    ///
    /// Exploration runs on a blocking worker. The namespace is never
    /// rebuilt; [`FsMapper::namespace`] returns the same value for the
    /// lifetime of the mapper and its clones.
    pub async fn explore(config: MapperConfig) -> Result<Self> {
        let default_document = config.default_document.clone();
        let max_depth = config.explore.max_depth;
        let namespace = tokio::task::spawn_blocking(move || Namespace::build(&config))
            .await
            .map_err(|error| MapperError::Internal(format!("exploration task failed: {error}")))?;
        Ok(Self::from_namespace(namespace, default_document).with_max_depth(max_depth))
    }

    pub fn from_namespace(namespace: Namespace, default_document: impl Into<String>) -> Self {
        Self {
            namespace: Arc::new(namespace),
            default_document: default_document.into().trim_start_matches('/').to_string(),
            max_depth: crate::explore::DEFAULT_MAX_DEPTH,
        }
    }

    /// Limits how many directory levels a crawl descends.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    pub fn default_document(&self) -> &str {
        &self.default_document
    }

    /// Physical location of a virtual path, for serving raw bytes.
    pub fn locate(&self, virtual_path: &str) -> Result<PathBuf> {
        Ok(self.namespace.resolve(virtual_path)?.physical_path())
    }

    /// Handles one request. Never fails; errors become error responses.
    pub async fn process(&self, request: Request) -> Response {
        let Some(raw) = request.cmd.as_deref() else {
            return Response::error(BAD_REQUEST, "no command. use: 'head', 'get'");
        };
        let Some(command) = Command::parse(raw) else {
            return Response::error(BAD_REQUEST, format!("unknown command '{raw}'. use: 'head', 'get'"));
        };

        let path = if request.path == "/" {
            format!("/{}", self.default_document)
        } else {
            request.path
        };

        let result = match command {
            Command::Head => self.head(&path).await.map(Some),
            Command::Get => self.get(&path).await.map(Some),
            Command::Subscribe => self.subscribe(&path).await.map(Some),
            Command::Unsubscribe => Ok(None),
        };

        match result {
            Ok(Some(stat)) => Response::Stat {
                stat,
                id: request.id,
            },
            Ok(None) => Response::Ack { id: request.id },
            Err(error) => {
                log::debug!("{} '{path}' failed: {error}", command.as_str());
                Response::error(NOT_FOUND, format!("path '{path}' - error: {error}"))
            }
        }
    }

    /// Metadata for a path; directories list their children.
    ///
    /// A trailing `!` or `.ls` crawls the directory recursively, replacing
    /// each subdirectory with its own full stat.
    pub async fn head(&self, path: &str) -> Result<Stat> {
        let (path, crawl) = strip_crawl_marker(path);
        let resolution = self.namespace.resolve(path)?;
        let physical = resolution.physical_path();
        let metadata = fs::metadata(&physical).await?;
        let info = StatInfo::from_metadata(path, &metadata);
        if !metadata.is_dir() {
            return Ok(Stat::File(FileStat {
                info,
                content: None,
                done: None,
            }));
        }

        let hasindex = if resolution.is_root() || resolution.is_top_level() {
            Some(has_index(&physical).await)
        } else {
            None
        };
        let entries = if crawl {
            self.crawl(path, &physical, resolution.dir(), self.max_depth).await?
        } else {
            listing(path, &physical, resolution.dir()).await?
        };
        Ok(Stat::Dir(DirStat {
            info,
            entries,
            hasindex,
        }))
    }

    /// Metadata plus content; directories list their child names.
    ///
    /// A request for `index.mjs` is answered with a sibling
    /// `index.reliant.mjs` when one exists, and the reported path follows.
    pub async fn get(&self, path: &str) -> Result<Stat> {
        let resolution = self.namespace.resolve(path)?;
        let mut physical = resolution.physical_path();
        let mut path = path.to_string();

        if physical.file_name() == Some(OsStr::new(DEFAULT_ENTRY_POINT)) {
            let alternate = physical.with_file_name(ALTERNATE_ENTRY_POINT);
            if fs::metadata(&alternate).await.is_ok() {
                physical = alternate;
                path = replace_virtual_name(&path, ALTERNATE_ENTRY_POINT);
            }
        }

        let metadata = fs::metadata(&physical).await?;
        let info = StatInfo::from_metadata(&path, &metadata);
        if metadata.is_dir() {
            let names = match resolution.dir() {
                Some(node) => node.names().map(str::to_string).collect(),
                None => read_names(&physical).await?,
            };
            return Ok(Stat::Dir(DirStat {
                info,
                entries: names.into_iter().map(Listing::Name).collect(),
                hasindex: None,
            }));
        }

        let content = fs::read(&physical).await?;
        Ok(Stat::File(FileStat {
            info,
            content: Some(content),
            done: Some(true),
        }))
    }

    /// Same as [`FsMapper::get`]. Changes are not watched.
    pub async fn subscribe(&self, path: &str) -> Result<Stat> {
        self.get(path).await
    }

    /// Stats every child of one level concurrently, then descends into the
    /// subdirectories one after another.
    fn crawl<'a>(
        &'a self,
        path: &'a str,
        physical: &'a Path,
        dir: Option<&'a DirNode>,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<Listing>>> {
        async move {
            let names: Vec<String> = match dir {
                Some(node) => node.names().map(str::to_string).collect(),
                None => read_names(physical).await?,
            };
            let stats = join_all(names.iter().map(|name| fs::metadata(physical.join(name)))).await;

            let mut entries = Vec::with_capacity(names.len());
            for (name, metadata) in names.into_iter().zip(stats) {
                let metadata = match metadata {
                    Ok(metadata) => metadata,
                    Err(error) => {
                        log::debug!("crawl skipped {}/{name}: {error}", physical.display());
                        continue;
                    }
                };
                if !metadata.is_dir() {
                    entries.push(Listing::Name(name));
                    continue;
                }

                let child_path = join_virtual(path, &name);
                let child_physical = physical.join(&name);
                let child_dir = dir.and_then(|node| node.dir_at(&[name.as_str()]));
                let nested = if depth > 1 {
                    self.crawl(&child_path, &child_physical, child_dir, depth - 1)
                        .await?
                } else {
                    Vec::new()
                };
                let hasindex = if is_top_level(&child_path) {
                    Some(has_index(&child_physical).await)
                } else {
                    None
                };
                entries.push(Listing::Stat(Box::new(Stat::Dir(DirStat {
                    info: StatInfo::from_metadata(&child_path, &metadata),
                    entries: nested,
                    hasindex,
                }))));
            }
            Ok(entries)
        }
        .boxed()
    }
}

/// One-level listing: file names, and subdirectories as structural nodes
/// carrying their own child names from the explored tree.
///
/// Subdirectories the depth bound cut off are listed from disk.
async fn listing(path: &str, physical: &Path, dir: Option<&DirNode>) -> Result<Vec<Listing>> {
    let Some(node) = dir else {
        let names = read_names(physical).await?;
        return Ok(names.into_iter().map(Listing::Name).collect());
    };
    let mut entries = Vec::new();
    for (name, entry) in node.iter() {
        let child = match entry {
            TreeEntry::File => {
                entries.push(Listing::Name(name.to_string()));
                continue;
            }
            TreeEntry::Dir(child) => child,
        };
        let names = if child.is_truncated() {
            read_names(&physical.join(name)).await.unwrap_or_default()
        } else {
            child.names().map(str::to_string).collect()
        };
        entries.push(Listing::Node(TreeNode {
            name: name.to_string(),
            kind: EntryKind::Dir,
            path: join_virtual(path, name),
            entries: names,
        }));
    }
    Ok(entries)
}

async fn has_index(dir: &Path) -> bool {
    is_file(&dir.join(DEFAULT_ENTRY_POINT)).await || is_file(&dir.join(ALTERNATE_ENTRY_POINT)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ComponentTable;
    use serde_json::json;
    use std::fs as stdfs;
    use tempfile::{tempdir, TempDir};

    fn write(path: &Path, content: &str) {
        stdfs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        stdfs::write(path, content).expect("write");
    }

    async fn mapper() -> (TempDir, FsMapper) {
        mapper_with_depth(crate::explore::DEFAULT_MAX_DEPTH).await
    }

    /// `www` -> `<tmp>/app`, `libA` -> `<tmp>/libs/libA`, one module family.
    async fn mapper_with_depth(max_depth: usize) -> (TempDir, FsMapper) {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        write(&root.join("app/thoregon.html"), "<html></html>");
        write(&root.join("app/index.mjs"), "export default 'plain';");
        write(&root.join("app/index.reliant.mjs"), "export default 'reliant';");
        write(&root.join("app/notes.txt"), "notes");
        write(&root.join("app/js/boot.mjs"), "boot");
        write(&root.join("libs/libA/readme.md"), "readme");
        write(&root.join("libs/libA/sub/a.mjs"), "a");
        write(&root.join("libs/libA/sub/deep/b.mjs"), "b");
        write(&root.join("libs/libA/.git/HEAD"), "ref");
        write(&root.join("universe/thoregon.modules/thoregon.core/index.mjs"), "core");
        stdfs::create_dir_all(root.join("cwd")).expect("mkdir");

        let mut components = ComponentTable::new();
        components.insert("www", root.join("app").to_string_lossy());
        components.insert("libA", root.join("libs/libA").to_string_lossy());
        let config = MapperConfig::new(root.join("cwd"))
            .with_module_root(root.join("universe"))
            .with_components(components)
            .with_max_depth(max_depth);
        let mapper = FsMapper::explore(config).await.expect("explore");
        (dir, mapper)
    }

    async fn run(mapper: &FsMapper, cmd: &str, path: &str) -> serde_json::Value {
        let request = Request {
            cmd: Some(cmd.to_string()),
            path: path.to_string(),
            id: Some(json!(1)),
            ..Request::default()
        };
        serde_json::to_value(mapper.process(request).await).expect("serialize")
    }

    #[test]
    fn crawl_markers_are_stripped() {
        assert_eq!(strip_crawl_marker("/libA!"), ("/libA", true));
        assert_eq!(strip_crawl_marker("/libA.ls"), ("/libA", true));
        assert_eq!(strip_crawl_marker("/!"), ("/", true));
        assert_eq!(strip_crawl_marker("!"), ("/", true));
        assert_eq!(strip_crawl_marker("/libA"), ("/libA", false));
    }

    #[tokio::test]
    async fn missing_command_is_bad_request() {
        let (_dir, mapper) = mapper().await;
        let response = mapper.process(Request::default()).await;
        assert_eq!(
            serde_json::to_value(response).expect("serialize"),
            json!({ "error": 400, "message": "no command. use: 'head', 'get'" })
        );
    }

    #[tokio::test]
    async fn unknown_command_is_bad_request() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "write", "/libA").await;
        assert_eq!(value["error"], 400);
        assert_eq!(value["message"], "unknown command 'write'. use: 'head', 'get'");
    }

    #[tokio::test]
    async fn unresolvable_path_is_not_found() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "get", "/nope").await;
        assert_eq!(
            value,
            json!({ "error": 404, "message": "path '/nope' - error: not found: '/nope'" })
        );
    }

    #[tokio::test]
    async fn vanished_file_is_not_found() {
        let (dir, mapper) = mapper().await;
        stdfs::remove_file(dir.path().join("app/notes.txt")).expect("remove");
        let value = run(&mapper, "get", "/notes.txt").await;
        assert_eq!(value["error"], 404);
        assert!(value["message"]
            .as_str()
            .expect("message")
            .starts_with("path '/notes.txt' - error: "));
    }

    #[tokio::test]
    async fn get_prefers_alternate_entry_point() {
        let (dir, mapper) = mapper().await;
        let value = run(&mapper, "get", "/index.mjs").await;
        let expected = stdfs::read(dir.path().join("app/index.reliant.mjs")).expect("read");
        assert_eq!(value["path"], "/index.reliant.mjs");
        assert_eq!(value["name"], "index.reliant.mjs");
        assert_eq!(value["type"], "file");
        assert_eq!(value["content"], json!(expected));
        assert_eq!(value["done"], true);
        assert_eq!(value["id"], 1);
    }

    #[tokio::test]
    async fn get_keeps_entry_point_without_alternate() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "get", "/thoregon.core/index.mjs").await;
        assert_eq!(value["path"], "/thoregon.core/index.mjs");
        assert_eq!(value["content"], json!(b"core".to_vec()));
    }

    #[tokio::test]
    async fn root_serves_default_document() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "get", "/").await;
        assert_eq!(value["path"], "/thoregon.html");
        assert_eq!(value["content"], json!(b"<html></html>".to_vec()));
    }

    #[tokio::test]
    async fn get_directory_lists_flat_names() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "get", "/libA").await;
        assert_eq!(value["type"], "dir");
        assert_eq!(value["entries"], json!(["readme.md", "sub"]));
        assert!(value.get("content").is_none());
    }

    #[tokio::test]
    async fn head_lists_one_level_with_structural_nodes() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "head", "/libA").await;
        assert_eq!(value["type"], "dir");
        assert_eq!(value["name"], "libA");
        assert_eq!(value["hasindex"], false);
        assert_eq!(
            value["entries"],
            json!([
                "readme.md",
                { "name": "sub", "type": "dir", "path": "/libA/sub", "entries": ["a.mjs", "deep"] }
            ])
        );
    }

    #[tokio::test]
    async fn head_crawl_nests_full_stats() {
        let (_dir, mapper) = mapper().await;
        for path in ["/libA!", "/libA.ls"] {
            let value = run(&mapper, "head", path).await;
            assert_eq!(value["path"], "/libA");
            let sub = &value["entries"][1];
            assert_eq!(sub["type"], "dir");
            assert_eq!(sub["path"], "/libA/sub");
            assert!(sub["mtime"].is_string());
            let deep = &sub["entries"][1];
            assert_eq!(deep["path"], "/libA/sub/deep");
            assert_eq!(deep["entries"], json!(["b.mjs"]));
            assert_eq!(sub["entries"][0], "a.mjs");
        }
    }

    #[tokio::test]
    async fn crawl_depth_is_bounded() {
        let (_dir, mapper) = mapper().await;
        let mapper = mapper.with_max_depth(1);
        let value = run(&mapper, "head", "/libA!").await;
        assert_eq!(value["entries"][1]["entries"], json!([]));
    }

    #[tokio::test]
    async fn head_reports_index_for_top_level_directories() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "head", "/thoregon.core").await;
        assert_eq!(value["hasindex"], true);

        let nested = run(&mapper, "head", "/libA/sub").await;
        assert!(nested.get("hasindex").is_none());
    }

    #[tokio::test]
    async fn root_crawl_reports_index() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "head", "/!").await;
        assert_eq!(value["type"], "dir");
        assert_eq!(value["hasindex"], true);
        let js = value["entries"]
            .as_array()
            .expect("entries")
            .iter()
            .find(|entry| entry["name"] == "js")
            .expect("js");
        assert_eq!(js["hasindex"], false);
    }

    #[tokio::test]
    async fn head_and_get_agree_on_file_metadata() {
        let (_dir, mapper) = mapper().await;
        let head = mapper.head("/notes.txt").await.expect("head");
        let get = mapper.get("/notes.txt").await.expect("get");
        assert_eq!(head.kind(), EntryKind::File);
        assert_eq!(head.kind(), get.kind());
        assert!(head.as_file().expect("file").content.is_none());
        assert_eq!(get.as_file().and_then(|file| file.content.as_deref()), Some(&b"notes"[..]));
        let (head, get) = (head.info(), get.info());
        assert_eq!(head.name, get.name);
        assert_eq!(head.birthtime, get.birthtime);
        assert_eq!(head.ctime, get.ctime);
        assert_eq!(head.mtime, get.mtime);
        assert_eq!(head.size, 5);
    }

    #[tokio::test]
    async fn subscribe_behaves_like_get() {
        let (_dir, mapper) = mapper().await;
        let subscribe = mapper
            .process(Request::new(Command::Subscribe, "/notes.txt").with_id("s1"))
            .await;
        let subscribe = serde_json::to_value(subscribe).expect("serialize");
        assert_eq!(subscribe["id"], "s1");
        let get = run(&mapper, "get", "/notes.txt").await;
        assert_eq!(subscribe["content"], get["content"]);
        assert_eq!(subscribe["path"], get["path"]);
    }

    #[tokio::test]
    async fn unsubscribe_acknowledges() {
        let (_dir, mapper) = mapper().await;
        let value = run(&mapper, "unsubscribe", "/anything").await;
        assert_eq!(value, json!({ "id": 1 }));
    }

    #[tokio::test]
    async fn unexplored_directories_are_read_from_disk() {
        let (dir, mapper) = mapper().await;
        write(&dir.path().join("libs/libA/late/new.mjs"), "new");
        write(&dir.path().join("libs/libA/late/.DS_Store"), "");
        let value = run(&mapper, "head", "/libA/late").await;
        assert_eq!(value["entries"], json!(["new.mjs"]));
    }

    #[tokio::test]
    async fn depth_capped_directories_are_read_from_disk() {
        let (_dir, mapper) = mapper_with_depth(2).await;
        let capped = mapper.get("/libA/sub/deep").await.expect("get");
        let names: Vec<_> = capped
            .as_dir()
            .expect("dir")
            .entries
            .iter()
            .map(|entry| serde_json::to_value(entry).expect("serialize"))
            .collect();
        assert_eq!(names, vec![json!("b.mjs")]);

        let value = run(&mapper, "head", "/libA/sub").await;
        assert_eq!(
            value["entries"][1],
            json!({ "name": "deep", "type": "dir", "path": "/libA/sub/deep", "entries": ["b.mjs"] })
        );
    }

    #[tokio::test]
    async fn namespace_is_shared_not_rebuilt() {
        let (dir, mapper) = mapper().await;
        let before = Arc::clone(mapper.namespace());
        write(&dir.path().join("app/added.txt"), "later");

        let clone = mapper.clone();
        assert!(Arc::ptr_eq(&before, clone.namespace()));
        assert!(!clone.namespace().document_root().tree.contains("added.txt"));
        let value = run(&clone, "get", "/added.txt").await;
        assert_eq!(value["error"], 404);
    }

    #[tokio::test]
    async fn locate_maps_to_physical_path() {
        let (dir, mapper) = mapper().await;
        let located = mapper.locate("/libA/sub/a.mjs").expect("locate");
        assert_eq!(located, dir.path().join("libs/libA/sub/a.mjs"));
        assert!(mapper.locate("/missing").is_err());
    }
}
