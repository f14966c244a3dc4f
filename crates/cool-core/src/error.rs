//! Semantic error taxonomy.
//!
//! Every variant renders exactly the message text shown after
//! `Semantic error:` in a diagnostic line. Variants are grouped by
//! [`ErrorCategory`]:
//!
//! - **Declaration**: redefinitions, illegal names, illegal parents
//! - **Linkage**: undefined parents, inheritance cycles
//! - **Type**: undefined types, incompatible types, operator misuse, bad calls
//! - **Entry point**: missing `Main.main()`

use thiserror::Error;

/// Coarse classification of a [`SemanticError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Declaration,
    Linkage,
    Type,
    EntryPoint,
}

/// A semantic error found by one of the analysis passes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    // ------------------------------------------------------------------
    // Declaration errors
    // ------------------------------------------------------------------
    #[error("Class has illegal name {name}")]
    IllegalClassName { name: String },

    #[error("Class {name} is redefined")]
    ClassRedefined { name: String },

    #[error("Class {class} has illegal parent {parent}")]
    IllegalParent { class: String, parent: String },

    #[error("Class {class} has attribute with illegal name self")]
    AttributeNamedSelf { class: String },

    #[error("Class {class} redefines attribute {name}")]
    AttributeRedefined { class: String, name: String },

    #[error("Class {class} redefines method {name}")]
    MethodRedefined { class: String, name: String },

    #[error("Method {method} of class {class} has formal parameter with illegal name self")]
    FormalNamedSelf { class: String, method: String },

    #[error("Method {method} of class {class} redefines formal parameter {name}")]
    FormalRedefined {
        class: String,
        method: String,
        name: String,
    },

    #[error("Method {method} of class {class} has formal parameter {name} with illegal type SELF_TYPE")]
    FormalSelfType {
        class: String,
        method: String,
        name: String,
    },

    #[error("Let variable has illegal name self")]
    LetNamedSelf,

    #[error("Case variable has illegal name self")]
    CaseNamedSelf,

    #[error("Case variable {name} has illegal type SELF_TYPE")]
    CaseSelfType { name: String },

    // ------------------------------------------------------------------
    // Linkage errors
    // ------------------------------------------------------------------
    #[error("Class {class} has undefined parent {parent}")]
    UndefinedParent { class: String, parent: String },

    #[error("Inheritance cycle for class {class}")]
    InheritanceCycle { class: String },

    // ------------------------------------------------------------------
    // Type errors
    // ------------------------------------------------------------------
    #[error("Class {class} redefines inherited attribute {name}")]
    InheritedAttributeRedefined { class: String, name: String },

    #[error("Class {class} has attribute {name} with undefined type {type_name}")]
    AttributeUndefinedType {
        class: String,
        name: String,
        type_name: String,
    },

    #[error("Type {found} of initialization expression of attribute {name} is incompatible with declared type {declared}")]
    AttributeInitMismatch {
        name: String,
        found: String,
        declared: String,
    },

    #[error("Class {class} has method {method} with undefined return type {type_name}")]
    ReturnTypeUndefined {
        class: String,
        method: String,
        type_name: String,
    },

    #[error("Method {method} of class {class} has formal parameter {name} with undefined type {type_name}")]
    FormalUndefinedType {
        class: String,
        method: String,
        name: String,
        type_name: String,
    },

    #[error("Class {class} overrides method {method} with different number of formal parameters")]
    OverrideArity { class: String, method: String },

    #[error("Class {class} overrides method {method} but changes type of formal parameter {formal} from {expected} to {found}")]
    OverrideFormalType {
        class: String,
        method: String,
        formal: String,
        expected: String,
        found: String,
    },

    #[error("Class {class} overrides method {method} but changes return type from {expected} to {found}")]
    OverrideReturnType {
        class: String,
        method: String,
        expected: String,
        found: String,
    },

    #[error("Type {found} of the body of method {method} is incompatible with declared return type {declared}")]
    MethodBodyMismatch {
        method: String,
        found: String,
        declared: String,
    },

    #[error("Let variable {name} has undefined type {type_name}")]
    LetUndefinedType { name: String, type_name: String },

    #[error("Type {found} of initialization expression of identifier {name} is incompatible with declared type {declared}")]
    LetInitMismatch {
        name: String,
        found: String,
        declared: String,
    },

    #[error("Cannot compare {left} with {right}")]
    IncomparableTypes { left: String, right: String },

    #[error("Operand of {op} has type {found} instead of {expected}")]
    OperandType {
        op: String,
        found: String,
        expected: String,
    },

    #[error("Cannot assign to self")]
    AssignToSelf,

    #[error("Type {found} of assigned expression is incompatible with declared type {declared} of identifier {name}")]
    AssignmentMismatch {
        name: String,
        found: String,
        declared: String,
    },

    #[error("new is used with undefined type {type_name}")]
    NewUndefinedType { type_name: String },

    #[error("Type of static dispatch cannot be SELF_TYPE")]
    StaticDispatchSelfType,

    #[error("Type {type_name} of static dispatch is undefined")]
    StaticDispatchUndefined { type_name: String },

    #[error("Type {type_name} of static dispatch is not a superclass of type {receiver}")]
    StaticDispatchNotAncestor { type_name: String, receiver: String },

    #[error("Undefined method {method} in class {class}")]
    UndefinedMethod { method: String, class: String },

    #[error("Method {method} of class {class} is applied to wrong number of arguments")]
    WrongArgumentCount { method: String, class: String },

    #[error("In call to method {method} of class {class}, actual type {found} of formal parameter {formal} is incompatible with declared type {declared}")]
    ArgumentMismatch {
        method: String,
        class: String,
        found: String,
        formal: String,
        declared: String,
    },

    #[error("If condition has type {found} instead of Bool")]
    IfCondition { found: String },

    #[error("While condition has type {found} instead of Bool")]
    WhileCondition { found: String },

    #[error("Case variable {name} has undefined type {type_name}")]
    CaseUndefinedType { name: String, type_name: String },

    #[error("Duplicate branch {type_name} in case statement")]
    CaseDuplicateBranch { type_name: String },

    #[error("Undefined identifier {name}")]
    UndefinedIdentifier { name: String },

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------
    #[error("No method main in class Main")]
    MissingEntryPoint,
}

impl SemanticError {
    /// Which part of the taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        use SemanticError::*;
        match self {
            IllegalClassName { .. }
            | ClassRedefined { .. }
            | IllegalParent { .. }
            | AttributeNamedSelf { .. }
            | AttributeRedefined { .. }
            | MethodRedefined { .. }
            | FormalNamedSelf { .. }
            | FormalRedefined { .. }
            | FormalSelfType { .. }
            | LetNamedSelf
            | CaseNamedSelf
            | CaseSelfType { .. } => ErrorCategory::Declaration,
            UndefinedParent { .. } | InheritanceCycle { .. } => ErrorCategory::Linkage,
            MissingEntryPoint => ErrorCategory::EntryPoint,
            _ => ErrorCategory::Type,
        }
    }
}
