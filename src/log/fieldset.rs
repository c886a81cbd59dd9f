//! FieldSet model: per-log annotations computed by readers.
//!
//! Heterogeneous reader output is associated with a log through a table
//! keyed by a stable `kind()` string. The accessor enforces the expected
//! kind at the call site (`FieldSet::as_message()` etc.) instead of a
//! runtime downcast, so a caller asking for the wrong kind gets a typed
//! error instead of a panic.

use chrono::{DateTime, Utc};

use crate::error::{KhiError, KhiResult};
use crate::parser::Severity;

use super::node::NodeReader;

pub const KIND_COMMON: &str = "common";
pub const KIND_MESSAGE: &str = "message";
pub const KIND_K8S_NODE_COMMON: &str = "k8s_node_common";
pub const KIND_K8S_CONTAINER: &str = "k8s_container";
pub const KIND_GCE_SERIAL_PORT: &str = "gce_serial_port";
pub const KIND_AUDIT_COMMON: &str = "audit_common";

/// A named group of extracted fields for a [`super::Log`], produced by
/// exactly one [`FieldSetReader`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSet {
    Common { timestamp: DateTime<Utc> },
    Message { main: String, severity: Option<Severity> },
    K8sNodeCommon { message: String, component: String, node_name: String },
    K8sContainer { namespace: String, pod: String, container: String, message: String },
    GceSerialPort { message: String, node_name: String, port: String },
    AuditCommon { method: String, resource_path: String, requestor: String },
}

impl FieldSet {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldSet::Common { .. } => KIND_COMMON,
            FieldSet::Message { .. } => KIND_MESSAGE,
            FieldSet::K8sNodeCommon { .. } => KIND_K8S_NODE_COMMON,
            FieldSet::K8sContainer { .. } => KIND_K8S_CONTAINER,
            FieldSet::GceSerialPort { .. } => KIND_GCE_SERIAL_PORT,
            FieldSet::AuditCommon { .. } => KIND_AUDIT_COMMON,
        }
    }

    pub fn as_common(&self) -> KhiResult<(&DateTime<Utc>,)> {
        match self {
            FieldSet::Common { timestamp } => Ok((timestamp,)),
            other => Err(wrong_kind(KIND_COMMON, other)),
        }
    }

    pub fn as_message(&self) -> KhiResult<(&str, Option<Severity>)> {
        match self {
            FieldSet::Message { main, severity } => Ok((main, *severity)),
            other => Err(wrong_kind(KIND_MESSAGE, other)),
        }
    }

    pub fn as_k8s_container(&self) -> KhiResult<(&str, &str, &str, &str)> {
        match self {
            FieldSet::K8sContainer { namespace, pod, container, message } => {
                Ok((namespace, pod, container, message))
            }
            other => Err(wrong_kind(KIND_K8S_CONTAINER, other)),
        }
    }
}

fn wrong_kind(expected: &str, actual: &FieldSet) -> KhiError {
    KhiError::TypeConversionFailed(format!(
        "expected field set kind '{expected}', got '{}'",
        actual.kind()
    ))
}

/// Declares the `Kind` a reader produces and computes it from a Log's node
/// tree. `read` may fail but must never partially
/// populate the result.
pub trait FieldSetReader: Send + Sync {
    fn kind(&self) -> &'static str;
    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet>;
}

/// Reads `metadata.timestamp` as an RFC3339 string into [`FieldSet::Common`].
pub struct CommonReader;

impl FieldSetReader for CommonReader {
    fn kind(&self) -> &'static str {
        KIND_COMMON
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let raw = node
            .get_str("metadata.timestamp")
            .ok_or_else(|| KhiError::InvalidInput("missing metadata.timestamp".into()))?;
        let timestamp = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| KhiError::InvalidInput(format!("bad timestamp '{raw}': {e}")))?
            .with_timezone(&Utc);
        Ok(FieldSet::Common { timestamp })
    }
}

/// Reads `textPayload` (or `jsonPayload.message`) through the structured
/// parser kernel to produce [`FieldSet::Message`].
pub struct MessageReader<'p> {
    parser: &'p dyn crate::parser::StructuredLogParser,
}

impl<'p> MessageReader<'p> {
    pub fn new(parser: &'p dyn crate::parser::StructuredLogParser) -> Self {
        Self { parser }
    }
}

impl<'p> FieldSetReader for MessageReader<'p> {
    fn kind(&self) -> &'static str {
        KIND_MESSAGE
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let raw = node
            .get_str("textPayload")
            .or_else(|| node.get_str("jsonPayload.message"))
            .ok_or_else(|| KhiError::InvalidInput("missing text payload".into()))?;
        let parsed = self
            .parser
            .try_parse(raw)
            .ok_or_else(|| KhiError::InvalidInput("no parser matched payload".into()))?;
        Ok(FieldSet::Message {
            main: parsed.msg().unwrap_or(raw).to_string(),
            severity: parsed.severity(),
        })
    }
}

/// Reads `resource.labels.{namespace_name,pod_name,container_name}` plus the
/// text payload into [`FieldSet::K8sContainer`].
pub struct K8sContainerReader<'p> {
    parser: &'p dyn crate::parser::StructuredLogParser,
}

impl<'p> K8sContainerReader<'p> {
    pub fn new(parser: &'p dyn crate::parser::StructuredLogParser) -> Self {
        Self { parser }
    }
}

impl<'p> FieldSetReader for K8sContainerReader<'p> {
    fn kind(&self) -> &'static str {
        KIND_K8S_CONTAINER
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let namespace = node
            .get_str("resource.labels.namespace_name")
            .ok_or_else(|| KhiError::InvalidInput("missing namespace_name".into()))?;
        let pod = node
            .get_str("resource.labels.pod_name")
            .ok_or_else(|| KhiError::InvalidInput("missing pod_name".into()))?;
        let container = node
            .get_str("resource.labels.container_name")
            .ok_or_else(|| KhiError::InvalidInput("missing container_name".into()))?;
        let raw = node.get_str("textPayload").unwrap_or("");
        let message = self
            .parser
            .try_parse(raw)
            .and_then(|r| r.msg().map(str::to_string))
            .unwrap_or_else(|| raw.to_string());

        Ok(FieldSet::K8sContainer {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            message,
        })
    }
}

/// Reads node-level kubelet/systemd component logs into
/// [`FieldSet::K8sNodeCommon`].
pub struct K8sNodeCommonReader<'p> {
    parser: &'p dyn crate::parser::StructuredLogParser,
}

impl<'p> K8sNodeCommonReader<'p> {
    pub fn new(parser: &'p dyn crate::parser::StructuredLogParser) -> Self {
        Self { parser }
    }
}

impl<'p> FieldSetReader for K8sNodeCommonReader<'p> {
    fn kind(&self) -> &'static str {
        KIND_K8S_NODE_COMMON
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let node_name = node
            .get_str("resource.labels.node_name")
            .ok_or_else(|| KhiError::InvalidInput("missing node_name".into()))?;
        let component = node
            .get_str("jsonPayload.SYSLOG_IDENTIFIER")
            .unwrap_or("unknown");
        let raw = node
            .get_str("jsonPayload.MESSAGE")
            .or_else(|| node.get_str("textPayload"))
            .unwrap_or("");
        let message = self
            .parser
            .try_parse(raw)
            .and_then(|r| r.msg().map(str::to_string))
            .unwrap_or_else(|| raw.to_string());

        Ok(FieldSet::K8sNodeCommon {
            message,
            component: component.to_string(),
            node_name: node_name.to_string(),
        })
    }
}

/// Reads GCE serial-port console output into [`FieldSet::GceSerialPort`].
pub struct GceSerialPortReader<'c> {
    converter: &'c crate::convert::ConverterChain,
}

impl<'c> GceSerialPortReader<'c> {
    pub fn new(converter: &'c crate::convert::ConverterChain) -> Self {
        Self { converter }
    }
}

impl<'c> FieldSetReader for GceSerialPortReader<'c> {
    fn kind(&self) -> &'static str {
        KIND_GCE_SERIAL_PORT
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let node_name = node
            .get_str("resource.labels.instance_id")
            .ok_or_else(|| KhiError::InvalidInput("missing instance_id".into()))?;
        let port = node.get_str("labels.port").unwrap_or("1");
        let raw = node
            .get_str("textPayload")
            .ok_or_else(|| KhiError::InvalidInput("missing serial payload".into()))?;
        Ok(FieldSet::GceSerialPort {
            message: self.converter.convert(raw),
            node_name: node_name.to_string(),
            port: port.to_string(),
        })
    }
}

/// Reads Kubernetes audit log entries into [`FieldSet::AuditCommon`].
pub struct AuditCommonReader;

impl FieldSetReader for AuditCommonReader {
    fn kind(&self) -> &'static str {
        KIND_AUDIT_COMMON
    }

    fn read(&self, node: &NodeReader<'_>) -> KhiResult<FieldSet> {
        let method = node
            .get_str("protoPayload.methodName")
            .ok_or_else(|| KhiError::InvalidInput("missing methodName".into()))?;
        let resource_path = node
            .get_str("protoPayload.resourceName")
            .ok_or_else(|| KhiError::InvalidInput("missing resourceName".into()))?;
        let requestor = node
            .get_str("protoPayload.authenticationInfo.principalEmail")
            .unwrap_or("unknown");
        Ok(FieldSet::AuditCommon {
            method: method.to_string(),
            resource_path: resource_path.to_string(),
            requestor: requestor.to_string(),
        })
    }
}
