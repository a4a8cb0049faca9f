//! Module-level import: declares globals and functions, then translates
//! every function body.

use airlift_core::{air, lir, Result};
use airlift_core::air::Signedness;

use super::constants::ConstantImporter;
use super::function::FunctionImporter;
use super::types::TypeImporter;
use super::ImportOptions;

/// Imports a LIR module into an AIR bundle.
///
/// Declarations are populated in a first pass so that type inference can
/// consult callee signatures while bodies are translated in the second pass.
pub struct BundleImporter<'m> {
    pub(crate) module: &'m lir::Module,
    pub(crate) options: ImportOptions,
    pub(crate) bundle: air::Bundle,
    /// By LIR function id; `None` for intrinsics that lower to dedicated
    /// statements or to nothing.
    fun_map: Vec<Option<air::FunId>>,
    global_map: Vec<air::GlobalId>,
}

impl<'m> BundleImporter<'m> {
    pub fn new(module: &'m lir::Module, options: ImportOptions) -> Self {
        let mut importer = Self {
            module,
            options,
            bundle: air::Bundle::default(),
            fun_map: Vec::with_capacity(module.functions.len()),
            global_map: Vec::with_capacity(module.globals.len()),
        };
        importer.declare_globals();
        importer.declare_functions();
        importer
    }

    /// Import every function body and return the populated bundle.
    pub fn import(mut self) -> Result<air::Bundle> {
        for (index, function) in self.module.functions.iter().enumerate() {
            if function.is_declaration() {
                continue;
            }
            let Some(air_id) = self.fun_map[index] else {
                continue;
            };
            tracing::debug!(function = %function.name, "importing function body");
            let code =
                FunctionImporter::new(&self, function, air_id).translate_body()?;
            self.bundle.functions[air_id as usize].code = Some(code);
        }
        Ok(self.bundle)
    }

    fn declare_globals(&mut self) {
        for (index, global) in self.module.globals.iter().enumerate() {
            let ty = self
                .type_importer()
                .translate_type(&global.ty, Signedness::Signed);
            let id = self.bundle.globals.len() as air::GlobalId;
            self.bundle.globals.push(air::GlobalVariable {
                name: global.name.clone(),
                ty: air::AirType::pointer_to(ty),
                has_debug_info: global.has_debug_info,
                frontend: Some(index as lir::GlobalId),
            });
            self.global_map.push(id);
        }
    }

    fn declare_functions(&mut self) {
        for (index, function) in self.module.functions.iter().enumerate() {
            if let Some(intrinsic) = &function.intrinsic {
                if !matches!(intrinsic, lir::Intrinsic::Other(_)) {
                    // Lowered to dedicated statements (or dropped); never a
                    // callee in the translated form.
                    self.fun_map.push(None);
                    continue;
                }
            }
            let ty = self
                .type_importer()
                .translate_type(&function.ty, Signedness::Signed);
            let id = self.bundle.functions.len() as air::FunId;
            let mut air_fun = air::Function::new(function.name.clone(), ty);
            air_fun.frontend = Some(index as lir::FunId);
            self.bundle.functions.push(air_fun);
            self.fun_map.push(Some(id));
        }
    }

    /// AIR function declared for a LIR function; `None` for intrinsics with
    /// dedicated lowerings.
    pub fn translate_function(&self, id: lir::FunId) -> Option<air::FunId> {
        self.fun_map[id as usize]
    }

    pub fn translate_global_variable(&self, id: lir::GlobalId) -> air::GlobalId {
        self.global_map[id as usize]
    }

    /// Whether calls to an intrinsic are dropped entirely.
    pub fn ignore_intrinsic(intrinsic: &lir::Intrinsic) -> bool {
        matches!(
            intrinsic,
            lir::Intrinsic::DbgDeclare
                | lir::Intrinsic::DbgAddr
                | lir::Intrinsic::DbgValue
                | lir::Intrinsic::LifetimeStart
                | lir::Intrinsic::LifetimeEnd
                | lir::Intrinsic::Assume
        )
    }

    pub(crate) fn type_importer(&self) -> TypeImporter<'m> {
        TypeImporter::new(&self.module.data_layout)
    }

    pub(crate) fn constant_importer(&self) -> ConstantImporter<'m> {
        ConstantImporter::new(self.type_importer())
    }
}

/// Import a whole LIR module into an AIR bundle.
pub fn import_module(module: &lir::Module, options: ImportOptions) -> Result<air::Bundle> {
    BundleImporter::new(module, options).import()
}
