use crate::dto::HealthRes;

/// Health check shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as alive.
    ///
    /// Does not probe the backend or storage: a healthy process can still fail requests when
    /// the generative text service is unreachable.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Critique is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_health_is_ok() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert!(!res.message.is_empty());
    }
}
