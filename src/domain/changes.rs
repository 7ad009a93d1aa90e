//! Row-level writes planned by the domain and committed by a store.
//!
//! A write set is applied in order, inside one transaction. `Put*` inserts or
//! replaces a row; `Delete*` removes an existing row.

use crate::domain::entities::*;
use crate::domain::ids::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    PutSection(Section),
    DeleteSection(SectionId),
    PutPolicy(Policy),
    DeletePolicy(PolicyId),
    PutPolicyVersion(PolicyVersion),
    DeletePolicyVersion(PolicyVersionId),
    PutAcknowledgement(Acknowledgement),
    DeleteAcknowledgement(AcknowledgementId),
    PutAnnotation(Annotation),
    DeleteAnnotation(AnnotationId),
    PutWorkflow(ApprovalWorkflow),
    DeleteWorkflow(WorkflowId),
    PutSignature(DocumentSignature),
    DeleteSignature(SignatureId),
}

impl Write {
    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            Write::PutSection(s) => format!("put section {}", s.id),
            Write::DeleteSection(id) => format!("delete section {id}"),
            Write::PutPolicy(p) => format!("put policy {}", p.id),
            Write::DeletePolicy(id) => format!("delete policy {id}"),
            Write::PutPolicyVersion(v) => format!("put policy version {}", v.id),
            Write::DeletePolicyVersion(id) => format!("delete policy version {id}"),
            Write::PutAcknowledgement(a) => format!("put acknowledgement {}", a.id),
            Write::DeleteAcknowledgement(id) => format!("delete acknowledgement {id}"),
            Write::PutAnnotation(a) => format!("put annotation {}", a.id),
            Write::DeleteAnnotation(id) => format!("delete annotation {id}"),
            Write::PutWorkflow(w) => format!("put approval workflow {}", w.id),
            Write::DeleteWorkflow(id) => format!("delete approval workflow {id}"),
            Write::PutSignature(s) => format!("put signature {}", s.id),
            Write::DeleteSignature(id) => format!("delete signature {id}"),
        }
    }
}
