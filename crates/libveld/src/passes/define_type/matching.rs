//! Typing of match expressions.
//!
//! Every arm is typed against the scrutinee's type. Bindings introduce
//! locals scoped to the arm body, guards are typed inside that same scope
//! and must be booleans, and the result is the arms' common type, widening
//! to `Any` when the arms disagree. Guards never narrow types.

use std::rc::Rc;

use crate::{
    ast::{MatchAst, PatternAst},
    scope::TypeScope,
    state::State,
    symbol::{SymbolTable, SymbolTableRef},
    types::TypeLocation,
};

use super::DefineType;

impl<'a> DefineType<'a> {
    pub(crate) fn on_match(&mut self, node: &MatchAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let scrutinee_type = self.on_expression(&node.scrutinee, scope, None);
        let boolean = self.state.types.builtins().boolean;

        let mut result: Option<TypeLocation> = None;
        let mut widened = false;

        for arm in node.arms.iter() {
            let locals = self
                .state
                .body_locals(arm.body.index)
                .unwrap_or_else(SymbolTable::new_ref);

            for pattern in arm.patterns.iter() {
                self.on_pattern(pattern, scrutinee_type, &locals);
            }

            // Arm bodies lower to their own code objects, so they get their
            // own block type.
            let arm_block = self.state.types.alloc(crate::types::TypeKind::Block(
                crate::types::BlockType::new(
                    crate::types::BlockKind::Closure,
                    "<match arm>".to_string(),
                    scope.self_type,
                ),
            ));
            self.state.set_block_type(arm.body.index, arm_block);

            let arm_scope = Rc::new(TypeScope {
                module: scope.module.clone(),
                self_type: scope.self_type,
                block_type: scope.block_type,
                locals: locals.clone(),
                parent: Some(scope.clone()),
                enclosing_method: scope.enclosing_method,
            });

            if let Some(guard) = arm.guard.as_deref() {
                let guard_type = self.on_expression(guard, &arm_scope, None);

                if !self.state.types.type_compatible(guard_type, boolean) {
                    self.type_mismatch(boolean, guard_type, guard.span());
                }
            }

            let arm_type = self.on_body(&arm.body, &arm_scope);
            merge(self.state, &mut result, &mut widened, arm_type);
        }

        if let Some(else_body) = node.else_body.as_ref() {
            let locals = self
                .state
                .body_locals(else_body.index)
                .unwrap_or_else(SymbolTable::new_ref);

            let else_block = self.state.types.alloc(crate::types::TypeKind::Block(
                crate::types::BlockType::new(
                    crate::types::BlockKind::Closure,
                    "<match else>".to_string(),
                    scope.self_type,
                ),
            ));
            self.state.set_block_type(else_body.index, else_block);

            let else_scope = Rc::new(TypeScope {
                module: scope.module.clone(),
                self_type: scope.self_type,
                block_type: scope.block_type,
                locals,
                parent: Some(scope.clone()),
                enclosing_method: scope.enclosing_method,
            });

            let else_type = self.on_body(else_body, &else_scope);
            merge(self.state, &mut result, &mut widened, else_type);
        }

        if widened {
            self.state.types.builtins().any
        } else {
            result.unwrap_or(self.state.types.builtins().nil)
        }
    }

    /// Checks one pattern against the type it matches and defines the
    /// locals it binds
    fn on_pattern(
        &mut self,
        pattern: &PatternAst,
        matched: TypeLocation,
        locals: &SymbolTableRef,
    ) {
        match pattern {
            PatternAst::Int { span, .. } => {
                let integer = self.state.types.builtins().integer;

                if !self.state.types.type_compatible(integer, matched) {
                    self.type_mismatch(matched, integer, span);
                }
            }
            PatternAst::Float { span, .. } => {
                let float = self.state.types.builtins().float;

                if !self.state.types.type_compatible(float, matched) {
                    self.type_mismatch(matched, float, span);
                }
            }
            PatternAst::Str { span, .. } => {
                let string = self.state.types.builtins().string;

                if !self.state.types.type_compatible(string, matched) {
                    self.type_mismatch(matched, string, span);
                }
            }
            PatternAst::Binding { name, span, .. } => {
                let defined = locals.borrow_mut().define(
                    name.clone(),
                    matched,
                    false,
                    Some(span.clone()),
                );

                match defined {
                    Ok(symbol) => symbol.reference(),
                    Err(error) => self.state.record(error),
                }
            }
            PatternAst::Wildcard { .. } => {}
            PatternAst::Constant { name, span, .. } => {
                let path = [name.clone()];
                let found = super::resolve_constant_path(self.state, &self.module, &path);

                match found {
                    Some(found) => {
                        if !self.state.types.type_compatible(found, matched) {
                            self.type_mismatch(matched, found, span);
                        }
                    }
                    None => {
                        self.state.record(crate::error::CompileError::undefined_constant(
                            name.clone(),
                            span,
                        ));
                    }
                }
            }
            PatternAst::Variant { fields, .. } => {
                let any = self.state.types.builtins().any;

                for field in fields.iter() {
                    self.on_pattern(field, any, locals);
                }
            }
            PatternAst::ClassShape { fields, .. } => {
                for (attribute, field) in fields.iter() {
                    let field_type = self
                        .state
                        .types
                        .lookup_method(matched, attribute)
                        .map(|symbol| symbol.value_type)
                        .unwrap_or(self.state.types.builtins().any);

                    self.on_pattern(field, field_type, locals);
                }
            }
            PatternAst::Tuple { fields, .. } => {
                let any = self.state.types.builtins().any;

                for field in fields.iter() {
                    self.on_pattern(field, any, locals);
                }
            }
        }
    }
}

fn merge(
    state: &State,
    result: &mut Option<TypeLocation>,
    widened: &mut bool,
    arm_type: TypeLocation,
) {
    match *result {
        None => *result = Some(arm_type),
        Some(current) => {
            if !state.types.type_compatible(arm_type, current)
                && !state.types.type_compatible(current, arm_type)
            {
                *widened = true;
            }
        }
    }
}
