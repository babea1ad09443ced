//! Shader cache with on-disk sources and hot reload.
//!
//! [`ShaderLibrary::compile_shader`] looks a vertex/fragment pair up by file
//! name. Sources come from the configured shader directory when the file
//! exists there, otherwise from the copies built into the binary. Each pair is
//! compiled once; asking again with the same layout returns the same
//! [`ShaderId`], asking with a different layout is an error.
//!
//! Sources read from disk are watched: [`ShaderLibrary::check_reload`]
//! recompiles a program whose files changed, and keeps the previous program
//! if the new source fails to compile.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::gpu::GpuContext;
use crate::shader::{Shader, ShaderError, ShaderLayout};

/// File name of the built-in vertex shader.
pub const VERTEX_SHADER: &str = "vertex.wgsl";
/// File name of the built-in fragment shader.
pub const FRAGMENT_SHADER: &str = "fragment.wgsl";

const BUILTIN: &[(&str, &str)] = &[
    (VERTEX_SHADER, include_str!("shaders/vertex.wgsl")),
    (FRAGMENT_SHADER, include_str!("shaders/fragment.wgsl")),
];

/// Type-safe handle to a shader compiled by a [`ShaderLibrary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderId(usize);

/// A shader source, either read from a file or built in.
#[derive(Debug)]
pub struct ShaderSource {
    name: String,
    path: Option<PathBuf>,
    last_modified: Option<SystemTime>,
    source: String,
}

impl ShaderSource {
    /// Read a source file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| ShaderError::Io {
            path: path.clone(),
            source,
        };
        let source = fs::read_to_string(&path).map_err(io_err)?;
        let last_modified = fs::metadata(&path).and_then(|m| m.modified()).ok();

        Ok(Self {
            name: file_name(&path),
            path: Some(path),
            last_modified,
            source,
        })
    }

    /// A built-in source, if one exists with this file name.
    pub fn builtin(name: &str) -> Option<Self> {
        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| Self {
                name: name.to_string(),
                path: None,
                last_modified: None,
                source: source.to_string(),
            })
    }

    /// Resolve `name` against `dir`, falling back to the built-in copy.
    pub fn resolve(dir: Option<&Path>, name: &str) -> Result<Self, ShaderError> {
        if let Some(path) = dir.map(|d| d.join(name)).filter(|p| p.is_file()) {
            return Self::from_file(path);
        }
        Self::builtin(name).ok_or_else(|| ShaderError::MissingSource(name.to_string()))
    }

    /// Reload the file if it changed on disk. Returns `true` if it did.
    ///
    /// Built-in sources never change.
    pub fn check_reload(&mut self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };
        let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };

        if self.last_modified.is_some_and(|last| modified <= last) {
            return false;
        }

        match fs::read_to_string(path) {
            Ok(source) => {
                self.source = source;
                self.last_modified = Some(modified);
                true
            }
            Err(e) => {
                log::warn!("failed to reread {}: {e}", path.display());
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path on disk, `None` for built-in sources.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

struct Program {
    vertex: ShaderSource,
    fragment: ShaderSource,
    layout: ShaderLayout,
    shader: Shader,
}

impl Program {
    fn label(&self) -> String {
        program_label(self.vertex.name(), self.fragment.name())
    }
}

fn program_label(vertex: &str, fragment: &str) -> String {
    format!("{vertex}+{fragment}")
}

fn check_layout(
    label: &str,
    cached: &ShaderLayout,
    requested: &ShaderLayout,
) -> Result<(), ShaderError> {
    if cached != requested {
        return Err(ShaderError::LayoutConflict(label.to_string()));
    }
    Ok(())
}

/// Compiled shaders keyed by `(vertex file, fragment file)`.
pub struct ShaderLibrary {
    dir: Option<PathBuf>,
    hot_reload: bool,
    programs: Vec<Program>,
    index: HashMap<(String, String), ShaderId>,
}

impl ShaderLibrary {
    /// Library reading from `dir` when given, built-in sources otherwise.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            hot_reload: true,
            programs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Enable or disable [`check_reload`](Self::check_reload).
    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Compile the `vertex`/`fragment` pair, or return the cached program.
    ///
    /// Fails with [`ShaderError::LayoutConflict`] if the pair was already
    /// compiled with a different `layout`.
    pub fn compile_shader(
        &mut self,
        gpu: &GpuContext,
        vertex: &str,
        fragment: &str,
        layout: ShaderLayout,
    ) -> Result<ShaderId, ShaderError> {
        let key = (vertex.to_string(), fragment.to_string());
        if let Some(&id) = self.index.get(&key) {
            let program = &self.programs[id.0];
            check_layout(&program.label(), &program.layout, &layout)?;
            return Ok(id);
        }

        let vertex_source = ShaderSource::resolve(self.dir(), vertex)?;
        let fragment_source = ShaderSource::resolve(self.dir(), fragment)?;
        for source in [&vertex_source, &fragment_source] {
            match source.path() {
                Some(path) => log::info!("loading shader {}", path.display()),
                None => log::info!("loading built-in shader {}", source.name()),
            }
        }

        let shader = Shader::new(
            gpu,
            &program_label(vertex, fragment),
            vertex_source.source(),
            fragment_source.source(),
            layout.clone(),
        )?;

        let id = ShaderId(self.programs.len());
        self.programs.push(Program {
            vertex: vertex_source,
            fragment: fragment_source,
            layout,
            shader,
        });
        self.index.insert(key, id);
        Ok(id)
    }

    /// The compiled program behind `id`.
    pub fn get(&self, id: ShaderId) -> &Shader {
        &self.programs[id.0].shader
    }

    /// Number of distinct programs compiled.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Recompile programs whose source files changed. Call once per frame.
    ///
    /// Returns the number of programs replaced.
    pub fn check_reload(&mut self, gpu: &GpuContext) -> usize {
        if !self.hot_reload {
            return 0;
        }

        let mut replaced = 0;
        for program in &mut self.programs {
            let vertex_changed = program.vertex.check_reload();
            let fragment_changed = program.fragment.check_reload();
            if !vertex_changed && !fragment_changed {
                continue;
            }

            let label = program.label();
            log::info!("reloading shader {label}");
            match Shader::new(
                gpu,
                &label,
                program.vertex.source(),
                program.fragment.source(),
                program.layout.clone(),
            ) {
                Ok(shader) => {
                    program.shader = shader;
                    replaced += 1;
                }
                Err(e) => log::error!("{e}; keeping previous version of {label}"),
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("twirl-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn builtins_exist_with_entry_points() {
        let vertex = ShaderSource::builtin(VERTEX_SHADER).unwrap();
        let fragment = ShaderSource::builtin(FRAGMENT_SHADER).unwrap();
        assert!(vertex.source().contains("fn vs("));
        assert!(vertex.source().contains("u_modelMatrix"));
        assert!(fragment.source().contains("fn fs("));
        assert!(vertex.path().is_none());
    }

    #[test]
    fn resolve_prefers_directory() {
        let dir = scratch_dir("resolve");
        fs::write(dir.join(VERTEX_SHADER), "// custom").unwrap();

        let vertex = ShaderSource::resolve(Some(dir.as_path()), VERTEX_SHADER).unwrap();
        assert_eq!(vertex.source(), "// custom");
        assert_eq!(vertex.path(), Some(dir.join(VERTEX_SHADER).as_path()));

        let fragment = ShaderSource::resolve(Some(dir.as_path()), FRAGMENT_SHADER).unwrap();
        assert!(fragment.path().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_unknown_name_fails() {
        let err = ShaderSource::resolve(None, "missing.wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::MissingSource(name) if name == "missing.wgsl"));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let path = std::env::temp_dir().join("twirl-does-not-exist.wgsl");
        let err = ShaderSource::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("twirl-does-not-exist.wgsl"));
    }

    #[test]
    fn file_source_reloads_on_change() {
        let dir = scratch_dir("reload");
        let path = dir.join(FRAGMENT_SHADER);
        fs::write(&path, "// one").unwrap();

        let mut source = ShaderSource::from_file(&path).unwrap();
        assert!(!source.check_reload());

        // Push the mtime forward explicitly; coarse filesystem clocks may not tick.
        fs::write(&path, "// two").unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert!(source.check_reload());
        assert_eq!(source.source(), "// two");
        assert!(!source.check_reload());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn builtin_never_reloads() {
        let mut source = ShaderSource::builtin(VERTEX_SHADER).unwrap();
        assert!(!source.check_reload());
    }

    #[test]
    fn cached_program_rejects_other_layout() {
        let layout = crate::scene::shader_layout();
        let label = program_label(VERTEX_SHADER, FRAGMENT_SHADER);
        assert!(check_layout(&label, &layout, &crate::scene::shader_layout()).is_ok());

        let other = layout
            .clone()
            .uniform("u_tint", crate::shader::UniformKind::Vec4);
        let err = check_layout(&label, &layout, &other).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::LayoutConflict(name) if name == "vertex.wgsl+fragment.wgsl"
        ));
    }

    #[test]
    fn empty_library() {
        let library = ShaderLibrary::new(None).with_hot_reload(false);
        assert!(library.is_empty());
        assert!(library.dir().is_none());
    }
}
