// Macros file - tracing macros are referenced by full path inside each macro

/// Standardized logging macros so backend calls, session transitions and
/// validation results share field names across the crate.

// ============================================================================
// Backend Call Logging Macros
// ============================================================================

/// Log the start of a backend call
#[macro_export]
macro_rules! log_backend_start {
    ($operation:expr, class_id = $class_id:expr) => {
        tracing::debug!(
            operation = $operation,
            class_id = %$class_id,
            "Backend call started"
        );
    };
    ($operation:expr, flashcard_id = $flashcard_id:expr) => {
        tracing::debug!(
            operation = $operation,
            flashcard_id = %$flashcard_id,
            "Backend call started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(operation = $operation, "Backend call started");
    };
}

/// Log successful completion of a backend call
#[macro_export]
macro_rules! log_backend_success {
    ($operation:expr, class_id = $class_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            class_id = %$class_id,
            "Backend call completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "Backend call completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(operation = $operation, "Backend call completed: {}", $msg);
    };
}

// ============================================================================
// Study Session Logging Macros
// ============================================================================

/// Log study session state changes
#[macro_export]
macro_rules! log_session_event {
    ($event:expr, class_id = $class_id:expr, phase = $phase:expr) => {
        tracing::debug!(
            component = "study_session",
            event = $event,
            class_id = ?$class_id,
            phase = ?$phase,
            "Study session event"
        );
    };
    ($event:expr, $msg:expr) => {
        tracing::info!(
            component = "study_session",
            event = $event,
            "Study session event: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log startup, shutdown and configuration events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
