//! Messages - The ITCH 5.0 wire catalog.
//!
//! Every record is a packed, big-endian, fixed-size layout starting with the
//! same 11-byte header. Records are decoded field by field at fixed offsets
//! rather than by casting the receive buffer, so nothing depends on native
//! struct layout or alignment.
//!
//! | Offset | Field           | Size |
//! |--------|-----------------|------|
//! | 0      | message type    | 1    |
//! | 1      | stock locate    | 2    |
//! | 3      | tracking number | 2    |
//! | 5      | timestamp       | 6    |

use byteorder::{BigEndian, ByteOrder};

/// Size of the common header in bytes
pub const HEADER_SIZE: usize = 11;

/// Size of the largest record in the catalog
pub const MAX_MESSAGE_SIZE: usize = 50;

/// Space-padded ASCII ticker
pub type Stock = [u8; 8];

/// The ticker with its padding stripped.
pub fn stock_symbol(stock: &Stock) -> &str {
    std::str::from_utf8(stock).unwrap_or("").trim_end()
}

// ============================================================================
// Field Codec
// ============================================================================

/// A fixed-width big-endian field.
pub trait WireField: Sized {
    const WIDTH: usize;

    /// Decode from the first `WIDTH` bytes of `buf`.
    fn read(buf: &[u8]) -> Self;

    fn write(&self, out: &mut Vec<u8>);
}

impl WireField for u8 {
    const WIDTH: usize = 1;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        buf[0]
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl WireField for u16 {
    const WIDTH: usize = 2;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        BigEndian::read_u16(buf)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl WireField for u32 {
    const WIDTH: usize = 4;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        BigEndian::read_u32(buf)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl WireField for i32 {
    const WIDTH: usize = 4;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        BigEndian::read_i32(buf)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl WireField for u64 {
    const WIDTH: usize = 8;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        BigEndian::read_u64(buf)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl<const N: usize> WireField for [u8; N] {
    const WIDTH: usize = N;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&buf[..N]);
        bytes
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

/// Sequential reader over a record buffer.
struct Fields<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    #[inline]
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn read<T: WireField>(&mut self) -> T {
        let value = T::read(&self.buf[self.pos..]);
        self.pos += T::WIDTH;
        value
    }
}

// ============================================================================
// Header
// ============================================================================

/// 48-bit nanoseconds since midnight, split into a 16-bit high half and a
/// 32-bit low half on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub upper: u16,
    pub lower: u32,
}

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self {
            upper: (nanos >> 32) as u16,
            lower: nanos as u32,
        }
    }

    #[inline]
    pub const fn nanos(self) -> u64 {
        (self.upper as u64) << 32 | self.lower as u64
    }
}

impl WireField for Timestamp {
    const WIDTH: usize = 6;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        Self {
            upper: BigEndian::read_u16(buf),
            lower: BigEndian::read_u32(&buf[2..]),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.upper.write(out);
        self.lower.write(out);
    }
}

/// Common prefix of every record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Raw type discriminant; may not be a known [`MessageType`]
    pub kind: u8,
    pub stock_locate: u16,
    pub tracking_number: u16,
    pub timestamp: Timestamp,
}

impl MessageHeader {
    pub const fn new(kind: MessageType, stock_locate: u16, timestamp_nanos: u64) -> Self {
        Self {
            kind: kind as u8,
            stock_locate,
            tracking_number: 0,
            timestamp: Timestamp::from_nanos(timestamp_nanos),
        }
    }

    #[inline]
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_byte(self.kind)
    }
}

impl WireField for MessageHeader {
    const WIDTH: usize = HEADER_SIZE;

    #[inline]
    fn read(buf: &[u8]) -> Self {
        let mut fields = Fields::new(buf);
        Self {
            kind: fields.read(),
            stock_locate: fields.read(),
            tracking_number: fields.read(),
            timestamp: fields.read(),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        self.kind.write(out);
        self.stock_locate.write(out);
        self.tracking_number.write(out);
        self.timestamp.write(out);
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Type discriminants, ASCII coded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageType {
    SystemEvent = b'S',
    StockDirectory = b'R',
    StockTradingAction = b'H',
    RegShoIndicator = b'Y',
    MarketParticipantPosition = b'L',
    MwcbDeclineLevel = b'V',
    MwcbStatus = b'W',
    IpoQuotingPeriodUpdate = b'K',
    LuldAuctionCollar = b'J',
    OperationalHalt = b'h',
    AddOrderNoMpid = b'A',
    AddOrderWithMpid = b'F',
    OrderExecuted = b'E',
    OrderExecutedWithPrice = b'C',
    OrderCancel = b'X',
    OrderDelete = b'D',
    OrderReplace = b'U',
    Trade = b'P',
    CrossTrade = b'Q',
    BrokenTrade = b'B',
    NetOrderImbalanceIndicator = b'I',
    RetailPriceImprovementIndicator = b'N',
}

impl MessageType {
    pub const ALL: [MessageType; 22] = [
        MessageType::SystemEvent,
        MessageType::StockDirectory,
        MessageType::StockTradingAction,
        MessageType::RegShoIndicator,
        MessageType::MarketParticipantPosition,
        MessageType::MwcbDeclineLevel,
        MessageType::MwcbStatus,
        MessageType::IpoQuotingPeriodUpdate,
        MessageType::LuldAuctionCollar,
        MessageType::OperationalHalt,
        MessageType::AddOrderNoMpid,
        MessageType::AddOrderWithMpid,
        MessageType::OrderExecuted,
        MessageType::OrderExecutedWithPrice,
        MessageType::OrderCancel,
        MessageType::OrderDelete,
        MessageType::OrderReplace,
        MessageType::Trade,
        MessageType::CrossTrade,
        MessageType::BrokenTrade,
        MessageType::NetOrderImbalanceIndicator,
        MessageType::RetailPriceImprovementIndicator,
    ];

    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'S' => MessageType::SystemEvent,
            b'R' => MessageType::StockDirectory,
            b'H' => MessageType::StockTradingAction,
            b'Y' => MessageType::RegShoIndicator,
            b'L' => MessageType::MarketParticipantPosition,
            b'V' => MessageType::MwcbDeclineLevel,
            b'W' => MessageType::MwcbStatus,
            b'K' => MessageType::IpoQuotingPeriodUpdate,
            b'J' => MessageType::LuldAuctionCollar,
            b'h' => MessageType::OperationalHalt,
            b'A' => MessageType::AddOrderNoMpid,
            b'F' => MessageType::AddOrderWithMpid,
            b'E' => MessageType::OrderExecuted,
            b'C' => MessageType::OrderExecutedWithPrice,
            b'X' => MessageType::OrderCancel,
            b'D' => MessageType::OrderDelete,
            b'U' => MessageType::OrderReplace,
            b'P' => MessageType::Trade,
            b'Q' => MessageType::CrossTrade,
            b'B' => MessageType::BrokenTrade,
            b'I' => MessageType::NetOrderImbalanceIndicator,
            b'N' => MessageType::RetailPriceImprovementIndicator,
            _ => return None,
        })
    }

    /// Total record size including the header.
    pub const fn size(self) -> usize {
        match self {
            MessageType::SystemEvent => SystemEvent::SIZE,
            MessageType::StockDirectory => StockDirectory::SIZE,
            MessageType::StockTradingAction => StockTradingAction::SIZE,
            MessageType::RegShoIndicator => RegShoIndicator::SIZE,
            MessageType::MarketParticipantPosition => MarketParticipantPosition::SIZE,
            MessageType::MwcbDeclineLevel => MwcbDeclineLevel::SIZE,
            MessageType::MwcbStatus => MwcbStatus::SIZE,
            MessageType::IpoQuotingPeriodUpdate => IpoQuotingPeriodUpdate::SIZE,
            MessageType::LuldAuctionCollar => LuldAuctionCollar::SIZE,
            MessageType::OperationalHalt => OperationalHalt::SIZE,
            MessageType::AddOrderNoMpid => AddOrderNoMpid::SIZE,
            MessageType::AddOrderWithMpid => AddOrderWithMpid::SIZE,
            MessageType::OrderExecuted => OrderExecuted::SIZE,
            MessageType::OrderExecutedWithPrice => OrderExecutedWithPrice::SIZE,
            MessageType::OrderCancel => OrderCancel::SIZE,
            MessageType::OrderDelete => OrderDelete::SIZE,
            MessageType::OrderReplace => OrderReplace::SIZE,
            MessageType::Trade => Trade::SIZE,
            MessageType::CrossTrade => CrossTrade::SIZE,
            MessageType::BrokenTrade => BrokenTrade::SIZE,
            MessageType::NetOrderImbalanceIndicator => NetOrderImbalanceIndicator::SIZE,
            MessageType::RetailPriceImprovementIndicator => RetailPriceImprovementIndicator::SIZE,
        }
    }

    /// Whether records of this type mutate a book.
    pub const fn is_book_event(self) -> bool {
        matches!(
            self,
            MessageType::AddOrderNoMpid
                | MessageType::AddOrderWithMpid
                | MessageType::OrderExecuted
                | MessageType::OrderExecutedWithPrice
                | MessageType::OrderCancel
                | MessageType::OrderDelete
                | MessageType::OrderReplace
        )
    }
}

/// A complete fixed-size record.
pub trait WireMessage: Sized {
    const TYPE: MessageType;
    /// Total size on the wire, header included
    const SIZE: usize;

    /// Decode from a buffer holding at least `SIZE` bytes, header first.
    fn decode(buf: &[u8]) -> Self;

    /// Append the wire form to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    fn header(&self) -> &MessageHeader;
}

macro_rules! wire_message {
    (
        $(#[$meta:meta])*
        $name:ident, $size:expr, {
            $( $(#[$field_meta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name {
            pub header: MessageHeader,
            $( $(#[$field_meta])* pub $field: $ty, )*
        }

        const _: () = assert!(HEADER_SIZE $( + <$ty as WireField>::WIDTH )* == $size);

        impl WireMessage for $name {
            const TYPE: MessageType = MessageType::$name;
            const SIZE: usize = $size;

            #[inline]
            fn decode(buf: &[u8]) -> Self {
                debug_assert!(buf.len() >= Self::SIZE);
                let mut fields = Fields::new(buf);
                let header = fields.read::<MessageHeader>();
                $( let $field = fields.read::<$ty>(); )*
                Self { header, $( $field, )* }
            }

            fn encode(&self, out: &mut Vec<u8>) {
                self.header.write(out);
                $( self.$field.write(out); )*
            }

            #[inline]
            fn header(&self) -> &MessageHeader {
                &self.header
            }
        }
    };
}

// --------------------------- Administrative ---------------------------------

wire_message! {
    /// Start/end of messages, system hours and market hours
    SystemEvent, 12, {
        event_code: u8,
    }
}

/// Event codes carried by [`SystemEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemEventCode {
    StartOfMessages = b'O',
    StartOfSystemHours = b'S',
    StartOfMarketHours = b'Q',
    EndOfMarketHours = b'M',
    EndOfSystemHours = b'E',
    EndOfMessages = b'C',
}

impl SystemEvent {
    pub fn code(&self) -> Option<SystemEventCode> {
        Some(match self.event_code {
            b'O' => SystemEventCode::StartOfMessages,
            b'S' => SystemEventCode::StartOfSystemHours,
            b'Q' => SystemEventCode::StartOfMarketHours,
            b'M' => SystemEventCode::EndOfMarketHours,
            b'E' => SystemEventCode::EndOfSystemHours,
            b'C' => SystemEventCode::EndOfMessages,
            _ => return None,
        })
    }
}

wire_message! {
    StockDirectory, 39, {
        stock: Stock,
        market_category: u8,
        financial_status_indicator: u8,
        round_lot_size: u32,
        round_lots_only: u8,
        issue_classification: u8,
        issue_subtype: [u8; 2],
        authenticity: u8,
        short_sale_threshold_indicator: u8,
        ipo_flag: u8,
        luld_reference_price_tier: u8,
        etp_flag: u8,
        etp_leverage_factor: u32,
        inverse_indicator: u8,
    }
}

wire_message! {
    StockTradingAction, 25, {
        stock: Stock,
        trading_state: u8,
        reserved: u8,
        reason: [u8; 4],
    }
}

wire_message! {
    RegShoIndicator, 20, {
        stock: Stock,
        reg_sho_action: u8,
    }
}

wire_message! {
    MarketParticipantPosition, 26, {
        mpid: [u8; 4],
        stock: Stock,
        primary_market_maker: u8,
        market_maker_mode: u8,
        market_participant_state: u8,
    }
}

wire_message! {
    /// Market-wide circuit breaker levels; prices are 8-decimal
    MwcbDeclineLevel, 35, {
        level_one: u64,
        level_two: u64,
        level_three: u64,
    }
}

wire_message! {
    MwcbStatus, 12, {
        breached_level: u8,
    }
}

wire_message! {
    IpoQuotingPeriodUpdate, 28, {
        stock: Stock,
        ipo_quotation_release_time: u32,
        ipo_quotation_release_qualifier: u8,
        ipo_price: i32,
    }
}

wire_message! {
    LuldAuctionCollar, 35, {
        stock: Stock,
        auction_collar_reference_price: i32,
        upper_auction_collar_price: i32,
        lower_auction_collar_price: i32,
        auction_collar_extension: u32,
    }
}

wire_message! {
    OperationalHalt, 21, {
        stock: Stock,
        market_code: u8,
        operational_halt_action: u8,
    }
}

// --------------------------- Order Events -----------------------------------

wire_message! {
    /// New resting order without attribution
    AddOrderNoMpid, 36, {
        order_reference_number: u64,
        buy_sell_indicator: u8,
        shares: u32,
        stock: Stock,
        /// 4-decimal fixed point
        price: i32,
    }
}

wire_message! {
    /// New resting order attributed to a market participant
    AddOrderWithMpid, 40, {
        order_reference_number: u64,
        buy_sell_indicator: u8,
        shares: u32,
        stock: Stock,
        /// 4-decimal fixed point
        price: i32,
        attribution: [u8; 4],
    }
}

wire_message! {
    /// A resting order traded at its limit price
    OrderExecuted, 31, {
        order_reference_number: u64,
        executed_shares: u32,
        match_number: u64,
    }
}

wire_message! {
    /// A resting order traded at a different price than its limit
    OrderExecutedWithPrice, 36, {
        order_reference_number: u64,
        executed_shares: u32,
        match_number: u64,
        printable: u8,
        /// 4-decimal fixed point
        execution_price: i32,
    }
}

wire_message! {
    /// Partial cancellation
    OrderCancel, 23, {
        order_reference_number: u64,
        cancelled_shares: u32,
    }
}

wire_message! {
    /// Full deletion of what remains
    OrderDelete, 19, {
        order_reference_number: u64,
    }
}

wire_message! {
    /// Cancel-replace onto a new reference number
    OrderReplace, 35, {
        original_order_reference_number: u64,
        new_order_reference_number: u64,
        shares: u32,
        /// 4-decimal fixed point
        price: i32,
    }
}

// --------------------------- Trades & Auctions ------------------------------

wire_message! {
    /// Execution against a non-displayed order
    Trade, 44, {
        order_reference_number: u64,
        buy_sell_indicator: u8,
        shares: u32,
        stock: Stock,
        price: i32,
        match_number: u64,
    }
}

wire_message! {
    CrossTrade, 40, {
        shares: u64,
        stock: Stock,
        cross_price: i32,
        match_number: u64,
        cross_type: u8,
    }
}

wire_message! {
    BrokenTrade, 19, {
        match_number: u64,
    }
}

wire_message! {
    NetOrderImbalanceIndicator, 50, {
        paired_shares: u64,
        imbalance_shares: u64,
        imbalance_direction: u8,
        stock: Stock,
        far_price: i32,
        near_price: i32,
        current_reference_price: i32,
        cross_type: u8,
        price_variation_indicator: u8,
    }
}

wire_message! {
    RetailPriceImprovementIndicator, 20, {
        stock: Stock,
        interest_flag: u8,
    }
}
