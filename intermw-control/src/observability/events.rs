//! Canonical structured event names used across `intermw-control`.

// Platform registration lifecycle events.
pub const PLATFORM_REGISTER_START: &str = "platform_register_start";
pub const PLATFORM_REGISTER_OK: &str = "platform_register_ok";
pub const PLATFORM_REGISTER_FAILED: &str = "platform_register_failed";
pub const PLATFORM_UNREGISTER_START: &str = "platform_unregister_start";
pub const PLATFORM_UNREGISTER_OK: &str = "platform_unregister_ok";
pub const PLATFORM_UNREGISTER_FAILED: &str = "platform_unregister_failed";
pub const PLATFORM_TOPICS_PURGED: &str = "platform_topics_purged";

// Bridge controller events.
pub const CONTROLLER_CONSTRUCT_FAILED: &str = "controller_construct_failed";
pub const CONTROLLER_ROLLBACK: &str = "controller_rollback";
pub const CONTROLLER_ACTIVE: &str = "controller_active";
pub const CONTROLLER_DESTROY: &str = "controller_destroy";
pub const CONTROLLER_DESTROY_SKIPPED: &str = "controller_destroy_skipped";

// Dispatch listener and worker events.
pub const DISPATCH_ENQUEUE: &str = "dispatch_enqueue";
pub const DISPATCH_ENQUEUE_FAILED: &str = "dispatch_enqueue_failed";
pub const DISPATCH_ATTEMPT: &str = "dispatch_attempt";
pub const DISPATCH_OK: &str = "dispatch_ok";
pub const DISPATCH_FAILED: &str = "dispatch_failed";
pub const DISPATCH_PANICKED: &str = "dispatch_panicked";
pub const DISPATCH_TIMED_OUT: &str = "dispatch_timed_out";
pub const DISPATCH_QUEUE_CLOSED: &str = "dispatch_queue_closed";
pub const DISPATCH_SHUTDOWN: &str = "dispatch_shutdown";

// Resource cache events.
pub const RESOURCE_PUBLISHER_CREATE: &str = "resource_publisher_create";
pub const RESOURCE_PUBLISHER_REUSE: &str = "resource_publisher_reuse";
pub const RESOURCE_SUBSCRIBE_OK: &str = "resource_subscribe_ok";
pub const RESOURCE_SUBSCRIBE_FAILED: &str = "resource_subscribe_failed";
pub const RESOURCE_RELEASE_OK: &str = "resource_release_ok";
pub const RESOURCE_RELEASE_FAILED: &str = "resource_release_failed";
pub const RESOURCE_CACHE_DESTROYED: &str = "resource_cache_destroyed";

// Error channel events.
pub const ERROR_REPORT_SENT: &str = "error_report_sent";
pub const ERROR_REPORT_FAILED: &str = "error_report_failed";
pub const ERROR_REPORT_UPSTREAM_FAILED: &str = "error_report_upstream_failed";
pub const ERROR_RECORD_RECEIVED: &str = "error_record_received";
pub const ERROR_RECORD_MALFORMED: &str = "error_record_malformed";

// Runtime events.
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
