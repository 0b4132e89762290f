mod amount;
mod currency;
mod pair;
mod trade;

pub use amount::Amount;
pub use currency::CryptoCurrency;
pub use pair::Pair;
pub use trade::{
    ExchangeLimits, ProviderId, Trade, TradeRequest, TradeState, TradeStatus, TransitionError,
};
