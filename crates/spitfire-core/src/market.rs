//! Resource marketplace: resting order books and the matching pass.
//!
//! Each resource keeps a buy queue and a sell queue in price-time priority
//! (best price first, earliest order first within a price). Browsing goes
//! through a snapshot cache with a bounded staleness window so read traffic
//! never contends with matching. Two locks, as in the rest of the trading
//! path: one for the live books, one for the cache.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use spitfire_protocol::{CityId, ClientId, OrderSide, Resource, TradeFill, TradeId, TradeListing};

pub const DEFAULT_CACHE_TTL_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("order amount must be positive")]
    InvalidAmount,
    #[error("order price must be positive")]
    InvalidPrice,
    #[error("order has no owning client or city")]
    MissingOwner,
}

/// A resting order on one side of a book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarketOrder {
    pub trade_id: TradeId,
    pub resource: Resource,
    pub side: OrderSide,
    pub amount: u64,
    pub price: u64,
    pub owner: ClientId,
    pub city: CityId,
    pub placed_at: u64,
}

impl MarketOrder {
    fn listing(&self) -> TradeListing {
        TradeListing {
            trade_id: self.trade_id,
            resource: self.resource,
            side: self.side,
            amount: self.amount,
            price: self.price,
            placed_at: self.placed_at,
        }
    }
}

/// Order submission as it arrives from a city's trade screen.
#[derive(Clone, Copy, Debug)]
pub struct OrderRequest {
    pub resource: Resource,
    pub side: OrderSide,
    pub amount: u64,
    pub price: u64,
    pub owner: ClientId,
    pub city: CityId,
}

#[derive(Debug, Default)]
struct Book {
    /// Highest price first, ties earliest first.
    buys: VecDeque<MarketOrder>,
    /// Lowest price first, ties earliest first.
    sells: VecDeque<MarketOrder>,
}

#[derive(Debug, Default)]
struct ListingCache {
    refreshed_at: [[u64; 2]; 4],
    listings: [[Vec<TradeListing>; 2]; 4],
}

#[derive(Debug)]
pub struct Market {
    next_trade_id: AtomicU64,
    live: Mutex<[Book; 4]>,
    cache: Mutex<ListingCache>,
    cache_ttl_ms: u64,
}

impl Default for Market {
    fn default() -> Self {
        Market::new(DEFAULT_CACHE_TTL_MS)
    }
}

#[inline]
fn resource_index(resource: Resource) -> usize {
    match resource {
        Resource::Food => 0,
        Resource::Wood => 1,
        Resource::Stone => 2,
        Resource::Iron => 3,
    }
}

#[inline]
fn side_index(side: OrderSide) -> usize {
    match side {
        OrderSide::Buy => 0,
        OrderSide::Sell => 1,
    }
}

impl Market {
    pub fn new(cache_ttl_ms: u64) -> Market {
        Market {
            next_trade_id: AtomicU64::new(1),
            live: Mutex::new(std::array::from_fn(|_| Book::default())),
            cache: Mutex::new(ListingCache::default()),
            cache_ttl_ms,
        }
    }

    /// Rest an order on its book, keeping price-time priority.
    pub fn place_order(&self, request: OrderRequest, now: u64) -> Result<TradeId, MarketError> {
        if request.amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        if request.price == 0 {
            return Err(MarketError::InvalidPrice);
        }
        if request.owner.is_none() {
            return Err(MarketError::MissingOwner);
        }

        let trade_id = TradeId(self.next_trade_id.fetch_add(1, Ordering::Relaxed));
        let order = MarketOrder {
            trade_id,
            resource: request.resource,
            side: request.side,
            amount: request.amount,
            price: request.price,
            owner: request.owner,
            city: request.city,
            placed_at: now,
        };

        let mut books = self.live.lock().expect("market lock");
        let book = &mut books[resource_index(request.resource)];
        match request.side {
            OrderSide::Buy => {
                // Strictly-better test keeps ties behind earlier orders.
                let at = book.buys.partition_point(|resting| resting.price >= order.price);
                book.buys.insert(at, order);
            }
            OrderSide::Sell => {
                let at = book.sells.partition_point(|resting| resting.price <= order.price);
                book.sells.insert(at, order);
            }
        }
        Ok(trade_id)
    }

    /// Withdraw a resting order; `None` if it was already filled or unknown.
    pub fn cancel_order(&self, resource: Resource, trade_id: TradeId) -> Option<MarketOrder> {
        let mut books = self.live.lock().expect("market lock");
        let book = &mut books[resource_index(resource)];
        for queue in [&mut book.buys, &mut book.sells] {
            if let Some(at) = queue.iter().position(|o| o.trade_id == trade_id) {
                return queue.remove(at);
            }
        }
        None
    }

    /// Browse one side of a book through the snapshot cache.
    ///
    /// The cache is refreshed from the live book at most once per staleness
    /// window; between refreshes readers see the previous snapshot.
    pub fn listings(&self, resource: Resource, side: OrderSide, now: u64) -> Vec<TradeListing> {
        let r = resource_index(resource);
        let s = side_index(side);

        let mut cache = self.cache.lock().expect("market cache lock");
        if now >= cache.refreshed_at[r][s].saturating_add(self.cache_ttl_ms) {
            let books = self.live.lock().expect("market lock");
            let queue = match side {
                OrderSide::Buy => &books[r].buys,
                OrderSide::Sell => &books[r].sells,
            };
            cache.listings[r][s] = queue.iter().map(MarketOrder::listing).collect();
            cache.refreshed_at[r][s] = now;
        }
        cache.listings[r][s].clone()
    }

    /// Read the live book directly, bypassing the cache. Admin surface.
    pub fn open_orders(&self, resource: Resource, side: OrderSide) -> Vec<TradeListing> {
        let books = self.live.lock().expect("market lock");
        let book = &books[resource_index(resource)];
        let queue = match side {
            OrderSide::Buy => &book.buys,
            OrderSide::Sell => &book.sells,
        };
        queue.iter().map(MarketOrder::listing).collect()
    }

    /// Matching pass over every resource.
    ///
    /// While the best bid prices at or above the best ask, the pair trades
    /// `min` of their remaining amounts at the ask price; an order reaching
    /// zero leaves its queue. The live-book lock is held for the whole pass,
    /// bounded by queue length.
    pub fn process(&self, now: u64) -> Vec<TradeFill> {
        let mut fills = Vec::new();
        let mut books = self.live.lock().expect("market lock");

        for resource in Resource::ALL {
            let book = &mut books[resource_index(resource)];
            loop {
                let (Some(buy), Some(sell)) = (book.buys.front(), book.sells.front()) else {
                    break;
                };
                if buy.price < sell.price {
                    break;
                }

                let amount = buy.amount.min(sell.amount);
                fills.push(TradeFill {
                    resource,
                    amount,
                    price: sell.price,
                    buyer: buy.owner,
                    seller: sell.owner,
                    buy_trade_id: buy.trade_id,
                    sell_trade_id: sell.trade_id,
                });

                let buy_done = buy.amount == amount;
                let sell_done = sell.amount == amount;
                if buy_done {
                    book.buys.pop_front();
                } else {
                    book.buys.front_mut().expect("checked above").amount -= amount;
                }
                if sell_done {
                    book.sells.pop_front();
                } else {
                    book.sells.front_mut().expect("checked above").amount -= amount;
                }
            }
        }

        if !fills.is_empty() {
            debug!(count = fills.len(), at = now, "market matching pass crossed orders");
        }
        fills
    }
}
