//! Configuración del agrupamiento
//!
//! Los parámetros operativos viven en la tabla system_config del tenant
//! (clave/valor como el sistema legacy); aquí se leen con defaults
//! documentados. Un valor no numérico se ignora con warning y se cae al
//! default; una fila de configuración rota nunca tumba el agrupamiento.

use tracing::warn;

use crate::repositories::TransportStore;
use crate::utils::errors::AppResult;

pub const KEY_MAX_PASSENGERS: &str = "max_passengers";
pub const KEY_TIME_WINDOW_MINUTES: &str = "time_window_minutes";
pub const KEY_FRETADO_LIMIT: &str = "fretado_limit";
pub const KEY_BLOCK_DUPLICATE_REQUESTS: &str = "block_duplicate_requests";

/// Parámetros del motor de agrupamiento y clasificación
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Máximo de pasajeros por viaje de clase vehículo (default: 3)
    pub max_passengers: usize,
    /// Janela de tiempo del agrupamiento en minutos (default: 30)
    pub time_window_minutes: i64,
    /// Un cluster con fretado_limit + 1 o más solicitaciones se sirve
    /// como fretado (default: 9)
    pub fretado_limit: usize,
    /// Política aún no decidida en producto: rechazar solicitaciones
    /// duplicadas del mismo colaborador/tipo/día (default: desactivada)
    pub block_duplicate_requests: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_passengers: 3,
            time_window_minutes: 30,
            fretado_limit: 9,
            block_duplicate_requests: false,
        }
    }
}

impl Settings {
    /// Carga la configuración desde el almacén, con defaults por clave
    pub async fn load(store: &dyn TransportStore) -> AppResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            max_passengers: parse_or_default(
                store.get_config_value(KEY_MAX_PASSENGERS).await?,
                KEY_MAX_PASSENGERS,
                defaults.max_passengers,
            ),
            time_window_minutes: parse_or_default(
                store.get_config_value(KEY_TIME_WINDOW_MINUTES).await?,
                KEY_TIME_WINDOW_MINUTES,
                defaults.time_window_minutes,
            ),
            fretado_limit: parse_or_default(
                store.get_config_value(KEY_FRETADO_LIMIT).await?,
                KEY_FRETADO_LIMIT,
                defaults.fretado_limit,
            ),
            block_duplicate_requests: parse_or_default(
                store.get_config_value(KEY_BLOCK_DUPLICATE_REQUESTS).await?,
                KEY_BLOCK_DUPLICATE_REQUESTS,
                defaults.block_duplicate_requests,
            ),
        })
    }
}

fn parse_or_default<T: std::str::FromStr + Copy>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> T {
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("⚠️ Valor inválido para config '{}': '{}', usando default", key, value);
                default
            }
        },
        None => default,
    }
}
