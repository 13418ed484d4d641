//! Kernel module contract.
//!
//! A kernel module is an externally supplied WGSL program that must expose
//! the three label kernels with the binding layout described by a
//! [`KernelInterface`]. Modules are checked against the interface when a
//! surface is built, before anything is dispatched:
//!
//! 1. [`KernelModule::validate`] scans the source: declared interface
//!    version, `@compute` entry point names, and the kind of every binding
//!    slot the contract uses.
//! 2. The wgpu surface then compiles the module and builds one pipeline
//!    per entry point against explicit layouts derived from the interface,
//!    so a kernel that touches an undeclared binding fails there.
//!
//! # Example
//!
//! ```
//! use seg_compute::kernel::{KernelInterface, KernelModule};
//!
//! let module = KernelModule::builtin();
//! module.validate(&KernelInterface::v1()).unwrap();
//! ```

use std::borrow::Cow;
use std::path::Path;

use tracing::{debug, warn};

use crate::{ComputeError, ComputeResult, shaders};

/// Interface version implemented by this crate.
pub const KERNEL_INTERFACE_VERSION: u32 = 1;

const VERSION_TAG: &str = "seg-kernel-interface:";

/// Resource kind of one binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var<storage, read>`
    StorageRead,
    /// `var<storage, read_write>`
    StorageReadWrite,
    /// `var<uniform>`
    Uniform,
}

impl std::fmt::Display for BindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageRead => write!(f, "storage, read"),
            Self::StorageReadWrite => write!(f, "storage, read_write"),
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

/// One binding slot of group 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// `@binding(N)`
    pub slot: u32,
    /// Expected resource kind.
    pub kind: BindingKind,
    /// Role of the slot, for diagnostics.
    pub role: &'static str,
}

/// A named compute entry point and the slots it is bound with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    /// WGSL function name.
    pub name: &'static str,
    /// Slots in ascending order.
    pub bindings: &'static [Binding],
}

const PIXELS: Binding = Binding { slot: 0, kind: BindingKind::StorageRead, role: "pixels" };
const LABELS_IN: Binding = Binding { slot: 1, kind: BindingKind::StorageRead, role: "labels_in" };
const LABELS_OUT: Binding = Binding { slot: 2, kind: BindingKind::StorageReadWrite, role: "labels_out" };
const DIFF: Binding = Binding { slot: 3, kind: BindingKind::StorageReadWrite, role: "diff" };
const PARAMS: Binding = Binding { slot: 4, kind: BindingKind::Uniform, role: "params" };

/// Versioned description of the three label kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelInterface {
    /// Interface version a module must declare (or omit).
    pub version: u32,
    /// `InitLabels(pixels) -> labels_out`
    pub init_labels: EntryPoint,
    /// `PropagateMinLabel(pixels, labels_in) -> labels_out`
    pub propagate: EntryPoint,
    /// `CompareGrids(labels_in, labels_out) -> diff`
    pub compare: EntryPoint,
}

impl KernelInterface {
    /// Interface version 1.
    pub const fn v1() -> Self {
        Self {
            version: KERNEL_INTERFACE_VERSION,
            init_labels: EntryPoint {
                name: "init_labels",
                bindings: &[PIXELS, LABELS_OUT, PARAMS],
            },
            propagate: EntryPoint {
                name: "propagate_min_label",
                bindings: &[PIXELS, LABELS_IN, LABELS_OUT, PARAMS],
            },
            compare: EntryPoint {
                name: "compare_grids",
                bindings: &[LABELS_IN, LABELS_OUT, DIFF, PARAMS],
            },
        }
    }

    /// All three entry points.
    pub fn entry_points(&self) -> [&EntryPoint; 3] {
        [&self.init_labels, &self.propagate, &self.compare]
    }
}

impl Default for KernelInterface {
    fn default() -> Self {
        Self::v1()
    }
}

/// WGSL source of a label kernel module.
#[derive(Debug, Clone)]
pub struct KernelModule {
    name: String,
    source: Cow<'static, str>,
    builtin: bool,
}

impl KernelModule {
    /// The module bundled with this crate.
    pub fn builtin() -> Self {
        Self {
            name: "builtin".into(),
            source: Cow::Borrowed(shaders::LABEL_KERNELS),
            builtin: true,
        }
    }

    /// Wraps externally supplied WGSL.
    pub fn from_wgsl(name: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            builtin: false,
        }
    }

    /// Loads WGSL from a file.
    pub fn from_file(path: impl AsRef<Path>) -> ComputeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ComputeError::KernelLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_wgsl(path.display().to_string(), source))
    }

    /// `true` for the module returned by [`builtin`](Self::builtin).
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Module name (file path for loaded modules).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// WGSL source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Version from a `// seg-kernel-interface: N` header, if present.
    pub fn declared_version(&self) -> Option<u32> {
        self.source.lines().find_map(|line| {
            let (_, rest) = line.split_once(VERSION_TAG)?;
            rest.trim().parse().ok()
        })
    }

    /// Names of all `@compute` functions, in source order.
    pub fn compute_entry_points(&self) -> Vec<String> {
        let code = strip_comments(&self.source);
        let mut names = Vec::new();
        let mut rest = code.as_str();
        while let Some(pos) = rest.find("@compute") {
            rest = &rest[pos + "@compute".len()..];
            let Some(fn_pos) = find_word(rest, "fn") else {
                break;
            };
            rest = rest[fn_pos + 2..].trim_start();
            let name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                names.push(name);
            }
        }
        names
    }

    /// Group-0 binding declarations as `(slot, kind)`, in source order.
    ///
    /// Declarations in any other bind group are skipped; the label kernels
    /// bind a single group.
    pub fn declared_bindings(&self) -> Vec<(u32, BindingKind)> {
        let code = strip_comments(&self.source);
        code.split(';')
            .filter_map(|decl| {
                let slot = attribute_value(decl, "@binding(")?;
                if attribute_value(decl, "@group(")? != 0 {
                    return None;
                }
                let var_pos = find_word(decl, "var")?;
                let kind = decl[var_pos + 3..]
                    .trim_start()
                    .strip_prefix('<')
                    .and_then(|s| s.split_once('>'))
                    .and_then(|(space, _)| parse_address_space(space))?;
                Some((slot, kind))
            })
            .collect()
    }

    /// Checks the source against `interface`.
    ///
    /// # Errors
    ///
    /// [`ComputeError::KernelContract`] on a version mismatch, a missing
    /// entry point, or a contract binding that is undeclared or declared
    /// with the wrong kind.
    pub fn validate(&self, interface: &KernelInterface) -> ComputeResult<()> {
        if let Some(version) = self.declared_version() {
            if version != interface.version {
                return Err(ComputeError::KernelContract {
                    entry_point: self.name.clone(),
                    reason: format!(
                        "module implements interface v{version}, expected v{}",
                        interface.version
                    ),
                });
            }
        }

        let found = self.compute_entry_points();
        let bindings = self.declared_bindings();

        for entry in interface.entry_points() {
            match found.iter().filter(|n| *n == entry.name).count() {
                0 => {
                    return Err(ComputeError::KernelContract {
                        entry_point: entry.name.into(),
                        reason: "missing @compute entry point".into(),
                    });
                }
                1 => {}
                n => {
                    return Err(ComputeError::KernelContract {
                        entry_point: entry.name.into(),
                        reason: format!("defined {n} times"),
                    });
                }
            }

            for binding in entry.bindings {
                match bindings.iter().find(|(slot, _)| *slot == binding.slot) {
                    None => {
                        return Err(ComputeError::KernelContract {
                            entry_point: entry.name.into(),
                            reason: format!(
                                "binding {} ({}) is not declared",
                                binding.slot, binding.role
                            ),
                        });
                    }
                    Some((_, kind)) if *kind != binding.kind => {
                        return Err(ComputeError::KernelContract {
                            entry_point: entry.name.into(),
                            reason: format!(
                                "binding {} ({}) declared as <{kind}>, expected <{}>",
                                binding.slot, binding.role, binding.kind
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for extra in found
            .iter()
            .filter(|n| interface.entry_points().iter().all(|e| e.name != n.as_str()))
        {
            warn!(module = %self.name, entry_point = %extra, "ignoring extra compute entry point");
        }

        debug!(module = %self.name, entry_points = found.len(), "kernel module validated");
        Ok(())
    }
}

/// Numeric argument of the first `attr` (e.g. `@group(`) in `decl`.
fn attribute_value(decl: &str, attr: &str) -> Option<u32> {
    let (_, rest) = decl.split_once(attr)?;
    let (value, _) = rest.split_once(')')?;
    value.trim().parse().ok()
}

fn parse_address_space(space: &str) -> Option<BindingKind> {
    let parts: Vec<&str> = space.split(',').map(str::trim).collect();
    match parts.as_slice() {
        ["uniform"] => Some(BindingKind::Uniform),
        ["storage"] | ["storage", "read"] => Some(BindingKind::StorageRead),
        ["storage", "read_write"] => Some(BindingKind::StorageReadWrite),
        _ => None,
    }
}

/// Byte offset of `word` in `s` where it stands alone as an identifier.
fn find_word(s: &str, word: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    s.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = s[..i].chars().next_back().is_none_or(|c| !is_ident(c));
        let after = s[i + word.len()..].chars().next().is_none_or(|c| !is_ident(c));
        before && after
    })
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        let line = rest.find("//");
        let block = rest.find("/*");
        match (line, block) {
            (Some(l), b) if b.is_none_or(|b| l < b) => {
                out.push_str(&rest[..l]);
                rest = rest[l..].find('\n').map_or("", |nl| &rest[l + nl..]);
            }
            (_, Some(b)) => {
                out.push_str(&rest[..b]);
                rest = rest[b + 2..].find("*/").map_or("", |end| &rest[b + 2 + end + 2..]);
                out.push(' ');
            }
            _ => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let module = KernelModule::builtin();
        assert_eq!(module.declared_version(), Some(KERNEL_INTERFACE_VERSION));
        assert_eq!(
            module.compute_entry_points(),
            vec!["init_labels", "propagate_min_label", "compare_grids"]
        );
        module.validate(&KernelInterface::v1()).unwrap();
    }

    #[test]
    fn test_builtin_bindings() {
        let bindings = KernelModule::builtin().declared_bindings();
        assert_eq!(
            bindings,
            vec![
                (0, BindingKind::StorageRead),
                (1, BindingKind::StorageRead),
                (2, BindingKind::StorageReadWrite),
                (3, BindingKind::StorageReadWrite),
                (4, BindingKind::Uniform),
            ]
        );
    }

    #[test]
    fn test_missing_entry_point() {
        let source = shaders::LABEL_KERNELS.replace("fn compare_grids", "fn compare_labels");
        let err = KernelModule::from_wgsl("renamed", source)
            .validate(&KernelInterface::v1())
            .unwrap_err();
        match err {
            ComputeError::KernelContract { entry_point, .. } => {
                assert_eq!(entry_point, "compare_grids")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_commented_out_entry_point_is_missing() {
        let source = shaders::LABEL_KERNELS.replace(
            "@compute @workgroup_size(16, 16, 1)\nfn init_labels",
            "// @compute @workgroup_size(16, 16, 1)\nfn init_labels",
        );
        let module = KernelModule::from_wgsl("commented", source);
        assert!(!module.compute_entry_points().contains(&"init_labels".to_string()));
        assert!(module.validate(&KernelInterface::v1()).is_err());
    }

    #[test]
    fn test_wrong_binding_kind() {
        let source = shaders::LABEL_KERNELS.replace(
            "var<storage, read_write> diff",
            "var<storage, read> diff",
        );
        let err = KernelModule::from_wgsl("ro-diff", source)
            .validate(&KernelInterface::v1())
            .unwrap_err();
        assert!(err.to_string().contains("binding 3"), "{err}");
    }

    #[test]
    fn test_binding_in_other_group_is_undeclared() {
        let source = shaders::LABEL_KERNELS.replace("@group(0) @binding(3)", "@group(1) @binding(3)");
        let module = KernelModule::from_wgsl("group1-diff", source);
        assert!(!module.declared_bindings().iter().any(|(slot, _)| *slot == 3));

        let err = module.validate(&KernelInterface::v1()).unwrap_err();
        match err {
            ComputeError::KernelContract { entry_point, reason } => {
                assert_eq!(entry_point, "compare_grids");
                assert!(reason.contains("binding 3"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_attribute_value() {
        assert_eq!(attribute_value("@group(0) @binding( 4 ) var", "@binding("), Some(4));
        assert_eq!(attribute_value("@binding(2) var", "@group("), None);
    }

    #[test]
    fn test_is_builtin() {
        assert!(KernelModule::builtin().is_builtin());
        assert!(!KernelModule::from_wgsl("builtin", shaders::LABEL_KERNELS.to_string()).is_builtin());
    }

    #[test]
    fn test_version_mismatch() {
        let source = shaders::LABEL_KERNELS.replace("seg-kernel-interface: 1", "seg-kernel-interface: 2");
        let err = KernelModule::from_wgsl("v2", source)
            .validate(&KernelInterface::v1())
            .unwrap_err();
        assert!(err.to_string().contains("v2"), "{err}");
    }

    #[test]
    fn test_missing_version_header_is_accepted() {
        let source = shaders::LABEL_KERNELS.replace("// seg-kernel-interface: 1", "");
        let module = KernelModule::from_wgsl("headerless", source);
        assert_eq!(module.declared_version(), None);
        module.validate(&KernelInterface::v1()).unwrap();
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.wgsl");
        std::fs::write(&path, shaders::LABEL_KERNELS).unwrap();

        let module = KernelModule::from_file(&path).unwrap();
        assert!(module.name().ends_with("labels.wgsl"));
        module.validate(&KernelInterface::v1()).unwrap();

        let missing = KernelModule::from_file(dir.path().join("nope.wgsl"));
        assert!(matches!(missing, Err(ComputeError::KernelLoad { .. })));
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a // b\nc"), "a \nc");
        assert_eq!(strip_comments("a /* b */ c"), "a   c");
    }
}
