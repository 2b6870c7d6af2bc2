// src/services/export/assembler.rs

//! Builds the export manifest: one node per course and module, in archive
//! order, each carrying its metadata document and file references.

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        module::{Module, StoredFile},
        task::{Difficulty, Task, TestCase},
        user::Actor,
    },
    store::Store,
    utils::sanitize::{UniqueNames, download_stem, module_label},
};

use super::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Course,
    Module,
}

impl NodeKind {
    /// Entry name of the node's metadata document.
    pub fn metadata_file(&self) -> &'static str {
        match self {
            NodeKind::Course => "course.json",
            NodeKind::Module => "module.json",
        }
    }
}

/// One directory of the archive.
#[derive(Debug, Clone)]
pub struct ManifestNode<F = StoredFile> {
    pub kind: NodeKind,
    /// Archive directory without trailing slash; empty for the root.
    pub directory: String,
    pub metadata: Value,
    pub task_count: usize,
    pub files: Vec<F>,
}

impl<F> ManifestNode<F> {
    /// Archive entry path for `name` inside this node's directory.
    pub fn entry_path(&self, name: &str) -> String {
        if self.directory.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.directory, name)
        }
    }

    /// Module with neither files nor tasks.
    pub fn is_empty_module(&self) -> bool {
        self.kind == NodeKind::Module && self.files.is_empty() && self.task_count == 0
    }
}

/// Everything that goes into one archive, independent of the archive format.
/// Nodes are listed in write order: the course node first, then its modules.
#[derive(Debug, Clone)]
pub struct ExportManifest<F = StoredFile> {
    /// Download file stem, already header-safe.
    pub archive_name: String,
    pub nodes: Vec<ManifestNode<F>>,
}

#[derive(Serialize)]
struct CourseMetadata<'a> {
    course_code: &'a str,
    course_name: &'a str,
    description: Option<&'a str>,
    subject: &'a str,
    course_test_questions: i32,
    modules: Vec<ModuleSummary>,
}

#[derive(Serialize)]
struct ModuleSummary {
    module_order: i32,
    module_name: String,
    directory: String,
}

#[derive(Serialize)]
struct ModuleMetadata<'a> {
    module_name: &'a str,
    description: Option<&'a str>,
    module_order: i32,
    tasks_per_module: i32,
    module_test_questions: i32,
    files: Vec<FileMetadata<'a>>,
    tasks: Vec<TaskExport<'a>>,
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    mimetype: Option<&'a str>,
    size: Option<i64>,
}

#[derive(Serialize)]
struct TaskExport<'a> {
    task_name: &'a str,
    description: Option<&'a str>,
    problem_statement: &'a str,
    constraints: Option<&'a str>,
    sample_input: Option<&'a str>,
    sample_output: Option<&'a str>,
    test_cases: Vec<&'a TestCase>,
    language: &'a str,
    time_limit: i32,
    points: i32,
    difficulty: Difficulty,
}

impl<'a> From<&'a Task> for TaskExport<'a> {
    fn from(task: &'a Task) -> Self {
        let mut test_cases: Vec<&TestCase> = task.test_cases.iter().collect();
        test_cases.sort_by_key(|tc| tc.order_index);

        Self {
            task_name: &task.task_name,
            description: task.description.as_deref(),
            problem_statement: &task.problem_statement,
            constraints: task.constraints.as_deref(),
            sample_input: task.sample_input.as_deref(),
            sample_output: task.sample_output.as_deref(),
            test_cases,
            language: &task.language,
            time_limit: task.time_limit,
            points: task.points,
            difficulty: task.difficulty,
        }
    }
}

fn module_node(module: Module, tasks: &[Task], directory: String) -> Result<ManifestNode, ExportError> {
    let metadata = serde_json::to_value(ModuleMetadata {
        module_name: &module.module_name,
        description: module.description.as_deref(),
        module_order: module.module_order,
        tasks_per_module: module.tasks_per_module,
        module_test_questions: module.module_test_questions,
        files: module
            .files
            .iter()
            .map(|f| FileMetadata {
                name: &f.name,
                mimetype: f.mimetype.as_deref(),
                size: f.size,
            })
            .collect(),
        tasks: tasks.iter().map(TaskExport::from).collect(),
    })?;

    Ok(ManifestNode {
        kind: NodeKind::Module,
        directory,
        metadata,
        task_count: tasks.len(),
        files: module.files.0,
    })
}

/// Manifest for a single module, laid out flat at the archive root.
pub async fn assemble_module(
    store: &dyn Store,
    module_id: i64,
    actor: Actor,
) -> Result<ExportManifest, AppError> {
    let module = store
        .find_module(module_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Module not found".to_string()))?;

    if !actor.can_manage(module.created_by) {
        return Err(AppError::AuthError(
            "Not authorized to export this module".to_string(),
        ));
    }

    let tasks = store.list_module_tasks(module.id).await?;
    let archive_name = download_stem(&module.module_name);
    let node = module_node(module, &tasks, String::new())?;

    Ok(ExportManifest {
        archive_name,
        nodes: vec![node],
    })
}

/// Manifest for a whole course: `course.json` at the root, then one
/// directory per module in ascending `module_order`.
pub async fn assemble_course(
    store: &dyn Store,
    course_id: i64,
    actor: Actor,
) -> Result<ExportManifest, AppError> {
    let course = store
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    if !actor.can_manage(course.instructor_id) {
        return Err(AppError::AuthError(
            "Not authorized to export this course".to_string(),
        ));
    }

    let mut modules = store.list_course_modules(course.id).await?;
    modules.sort_by(|a, b| {
        (a.module_order, a.created_at, a.id).cmp(&(b.module_order, b.created_at, b.id))
    });

    let mut labels = UniqueNames::new();
    let mut summaries = Vec::with_capacity(modules.len());
    let mut module_nodes = Vec::with_capacity(modules.len());

    for module in modules {
        let directory = labels.claim_label(&module_label(module.module_order, &module.module_name));
        let tasks = store.list_module_tasks(module.id).await?;

        summaries.push(ModuleSummary {
            module_order: module.module_order,
            module_name: module.module_name.clone(),
            directory: directory.clone(),
        });
        module_nodes.push(module_node(module, &tasks, directory)?);
    }

    let metadata = serde_json::to_value(CourseMetadata {
        course_code: &course.course_code,
        course_name: &course.course_name,
        description: course.description.as_deref(),
        subject: &course.subject,
        course_test_questions: course.course_test_questions,
        modules: summaries,
    })
    .map_err(ExportError::from)?;

    let mut nodes = Vec::with_capacity(module_nodes.len() + 1);
    nodes.push(ManifestNode {
        kind: NodeKind::Course,
        directory: String::new(),
        metadata,
        task_count: 0,
        files: Vec::new(),
    });
    nodes.extend(module_nodes);

    tracing::debug!(course_id, modules = nodes.len() - 1, "Course manifest assembled");

    Ok(ExportManifest {
        archive_name: download_stem(&course.course_name),
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            course::NewCourse,
            module::NewModule,
            task::NewTask,
            user::Role,
        },
        store::MemoryStore,
    };

    const OWNER: Actor = Actor { id: 1, role: Role::Instructor };

    async fn course(store: &MemoryStore) -> i64 {
        store
            .create_course(NewCourse {
                course_code: "CS101".to_string(),
                course_name: "Intro to CS".to_string(),
                description: None,
                subject: "Computing".to_string(),
                instructor_id: OWNER.id,
                course_test_questions: 5,
            })
            .await
            .unwrap()
            .id
    }

    async fn module(store: &MemoryStore, course_id: i64, order: i32, name: &str) -> i64 {
        store
            .create_module(NewModule {
                course_id,
                module_name: name.to_string(),
                description: None,
                module_order: order,
                tasks_per_module: 10,
                module_test_questions: 3,
                files: Vec::new(),
                created_by: OWNER.id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn course_nodes_follow_module_order_with_unique_labels() {
        let store = MemoryStore::new();
        let course_id = course(&store).await;
        module(&store, course_id, 2, "Loops").await;
        module(&store, course_id, 1, "Intro").await;
        module(&store, course_id, 3, "Functions").await;
        module(&store, course_id, 1, "Intro").await;

        let manifest = assemble_course(&store, course_id, OWNER).await.unwrap();
        let dirs: Vec<&str> = manifest.nodes.iter().map(|n| n.directory.as_str()).collect();
        assert_eq!(dirs, ["", "1_Intro", "1_Intro_2", "2_Loops", "3_Functions"]);
        assert_eq!(manifest.archive_name, "Intro_to_CS");

        let summary = &manifest.nodes[0].metadata["modules"];
        assert_eq!(summary[1]["directory"], "1_Intro_2");
        assert_eq!(manifest.nodes[0].metadata["course_code"], "CS101");
    }

    #[tokio::test]
    async fn module_metadata_projects_tasks_without_bookkeeping() {
        let store = MemoryStore::new();
        let course_id = course(&store).await;
        let module_id = module(&store, course_id, 1, "Basics").await;
        store
            .create_task(NewTask {
                module_id,
                task_name: "Sum".to_string(),
                description: None,
                problem_statement: "Add".to_string(),
                constraints: None,
                expected_output: None,
                sample_input: None,
                sample_output: None,
                difficulty: Difficulty::Easy,
                points: 10,
                time_limit: 30,
                language: "Python".to_string(),
                test_cases: vec![
                    TestCase {
                        input: "2 2".to_string(),
                        expected_output: "4".to_string(),
                        is_sample: false,
                        order_index: 1,
                    },
                    TestCase {
                        input: "1 1".to_string(),
                        expected_output: "2".to_string(),
                        is_sample: true,
                        order_index: 0,
                    },
                ],
            })
            .await
            .unwrap();

        let manifest = assemble_module(&store, module_id, OWNER).await.unwrap();
        assert_eq!(manifest.nodes.len(), 1);

        let node = &manifest.nodes[0];
        assert_eq!(node.directory, "");
        assert_eq!(node.task_count, 1);

        let task = &node.metadata["tasks"][0];
        assert_eq!(task["difficulty"], "EASY");
        assert_eq!(task["test_cases"][0]["input"], "1 1");
        assert!(task.get("id").is_none());
        assert!(task.get("created_at").is_none());
        assert!(node.metadata.get("created_by").is_none());
    }

    #[tokio::test]
    async fn strangers_are_refused_and_admins_allowed() {
        let store = MemoryStore::new();
        let course_id = course(&store).await;
        let module_id = module(&store, course_id, 1, "Basics").await;

        let stranger = Actor { id: 99, role: Role::Instructor };
        assert!(matches!(
            assemble_course(&store, course_id, stranger).await,
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            assemble_module(&store, module_id, stranger).await,
            Err(AppError::AuthError(_))
        ));

        let admin = Actor { id: 50, role: Role::Admin };
        assert!(assemble_module(&store, module_id, admin).await.is_ok());

        assert!(matches!(
            assemble_module(&store, 12345, OWNER).await,
            Err(AppError::NotFound(_))
        ));
    }
}
