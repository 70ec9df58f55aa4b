//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Warehouse table schema.
#[derive(Iden, Clone, Copy)]
pub enum Warehouse {
    #[iden = "warehouse"]
    Table,
    #[iden = "w_id"]
    WId,
    #[iden = "w_name"]
    WName,
    #[iden = "w_street_1"]
    WStreet1,
    #[iden = "w_street_2"]
    WStreet2,
    #[iden = "w_city"]
    WCity,
    #[iden = "w_state"]
    WState,
    #[iden = "w_zip"]
    WZip,
    #[iden = "w_tax"]
    WTax,
    #[iden = "w_ytd"]
    WYtd,
}

impl Warehouse {
    pub const COLUMNS: [Warehouse; 9] = [
        Warehouse::WId,
        Warehouse::WName,
        Warehouse::WStreet1,
        Warehouse::WStreet2,
        Warehouse::WCity,
        Warehouse::WState,
        Warehouse::WZip,
        Warehouse::WTax,
        Warehouse::WYtd,
    ];
}

/// District table schema.
#[derive(Iden, Clone, Copy)]
pub enum District {
    #[iden = "district"]
    Table,
    #[iden = "d_id"]
    DId,
    #[iden = "d_w_id"]
    DWId,
    #[iden = "d_name"]
    DName,
    #[iden = "d_street_1"]
    DStreet1,
    #[iden = "d_street_2"]
    DStreet2,
    #[iden = "d_city"]
    DCity,
    #[iden = "d_state"]
    DState,
    #[iden = "d_zip"]
    DZip,
    #[iden = "d_tax"]
    DTax,
    #[iden = "d_ytd"]
    DYtd,
    #[iden = "d_next_o_id"]
    DNextOId,
}

impl District {
    pub const COLUMNS: [District; 11] = [
        District::DId,
        District::DWId,
        District::DName,
        District::DStreet1,
        District::DStreet2,
        District::DCity,
        District::DState,
        District::DZip,
        District::DTax,
        District::DYtd,
        District::DNextOId,
    ];
}

/// Customer table schema.
#[derive(Iden, Clone, Copy)]
pub enum Customer {
    #[iden = "customer"]
    Table,
    #[iden = "c_id"]
    CId,
    #[iden = "c_d_id"]
    CDId,
    #[iden = "c_w_id"]
    CWId,
    #[iden = "c_first"]
    CFirst,
    #[iden = "c_middle"]
    CMiddle,
    #[iden = "c_last"]
    CLast,
    #[iden = "c_street_1"]
    CStreet1,
    #[iden = "c_street_2"]
    CStreet2,
    #[iden = "c_city"]
    CCity,
    #[iden = "c_state"]
    CState,
    #[iden = "c_zip"]
    CZip,
    #[iden = "c_phone"]
    CPhone,
    #[iden = "c_since"]
    CSince,
    #[iden = "c_credit"]
    CCredit,
    #[iden = "c_credit_lim"]
    CCreditLim,
    #[iden = "c_discount"]
    CDiscount,
    #[iden = "c_balance"]
    CBalance,
    #[iden = "c_ytd_payment"]
    CYtdPayment,
    #[iden = "c_payment_cnt"]
    CPaymentCnt,
    #[iden = "c_delivery_cnt"]
    CDeliveryCnt,
    #[iden = "c_data"]
    CData,
}

impl Customer {
    pub const COLUMNS: [Customer; 21] = [
        Customer::CId,
        Customer::CDId,
        Customer::CWId,
        Customer::CFirst,
        Customer::CMiddle,
        Customer::CLast,
        Customer::CStreet1,
        Customer::CStreet2,
        Customer::CCity,
        Customer::CState,
        Customer::CZip,
        Customer::CPhone,
        Customer::CSince,
        Customer::CCredit,
        Customer::CCreditLim,
        Customer::CDiscount,
        Customer::CBalance,
        Customer::CYtdPayment,
        Customer::CPaymentCnt,
        Customer::CDeliveryCnt,
        Customer::CData,
    ];
}

/// History table schema.
#[derive(Iden, Clone, Copy)]
pub enum History {
    #[iden = "history"]
    Table,
    #[iden = "h_c_id"]
    HCId,
    #[iden = "h_c_d_id"]
    HCDId,
    #[iden = "h_c_w_id"]
    HCWId,
    #[iden = "h_d_id"]
    HDId,
    #[iden = "h_w_id"]
    HWId,
    #[iden = "h_date"]
    HDate,
    #[iden = "h_amount"]
    HAmount,
    #[iden = "h_data"]
    HData,
}

impl History {
    pub const COLUMNS: [History; 8] = [
        History::HCId,
        History::HCDId,
        History::HCWId,
        History::HDId,
        History::HWId,
        History::HDate,
        History::HAmount,
        History::HData,
    ];
}

/// New-order queue table schema.
#[derive(Iden, Clone, Copy)]
pub enum NewOrder {
    #[iden = "new_order"]
    Table,
    #[iden = "no_o_id"]
    NoOId,
    #[iden = "no_d_id"]
    NoDId,
    #[iden = "no_w_id"]
    NoWId,
}

impl NewOrder {
    pub const COLUMNS: [NewOrder; 3] = [NewOrder::NoOId, NewOrder::NoDId, NewOrder::NoWId];
}

/// Orders table schema.
#[derive(Iden, Clone, Copy)]
pub enum Orders {
    #[iden = "orders"]
    Table,
    #[iden = "o_id"]
    OId,
    #[iden = "o_d_id"]
    ODId,
    #[iden = "o_w_id"]
    OWId,
    #[iden = "o_c_id"]
    OCId,
    #[iden = "o_entry_d"]
    OEntryD,
    #[iden = "o_carrier_id"]
    OCarrierId,
    #[iden = "o_ol_cnt"]
    OOlCnt,
    #[iden = "o_all_local"]
    OAllLocal,
}

impl Orders {
    pub const COLUMNS: [Orders; 8] = [
        Orders::OId,
        Orders::ODId,
        Orders::OWId,
        Orders::OCId,
        Orders::OEntryD,
        Orders::OCarrierId,
        Orders::OOlCnt,
        Orders::OAllLocal,
    ];
}

/// Order-line table schema.
#[derive(Iden, Clone, Copy)]
pub enum OrderLine {
    #[iden = "order_line"]
    Table,
    #[iden = "ol_o_id"]
    OlOId,
    #[iden = "ol_d_id"]
    OlDId,
    #[iden = "ol_w_id"]
    OlWId,
    #[iden = "ol_number"]
    OlNumber,
    #[iden = "ol_i_id"]
    OlIId,
    #[iden = "ol_supply_w_id"]
    OlSupplyWId,
    #[iden = "ol_delivery_d"]
    OlDeliveryD,
    #[iden = "ol_quantity"]
    OlQuantity,
    #[iden = "ol_amount"]
    OlAmount,
    #[iden = "ol_dist_info"]
    OlDistInfo,
}

impl OrderLine {
    pub const COLUMNS: [OrderLine; 10] = [
        OrderLine::OlOId,
        OrderLine::OlDId,
        OrderLine::OlWId,
        OrderLine::OlNumber,
        OrderLine::OlIId,
        OrderLine::OlSupplyWId,
        OrderLine::OlDeliveryD,
        OrderLine::OlQuantity,
        OrderLine::OlAmount,
        OrderLine::OlDistInfo,
    ];
}

/// Item table schema.
#[derive(Iden, Clone, Copy)]
pub enum Item {
    #[iden = "item"]
    Table,
    #[iden = "i_id"]
    IId,
    #[iden = "i_im_id"]
    IImId,
    #[iden = "i_name"]
    IName,
    #[iden = "i_price"]
    IPrice,
    #[iden = "i_data"]
    IData,
}

impl Item {
    pub const COLUMNS: [Item; 5] = [Item::IId, Item::IImId, Item::IName, Item::IPrice, Item::IData];
}

/// Stock table schema.
#[derive(Iden, Clone, Copy)]
pub enum Stock {
    #[iden = "stock"]
    Table,
    #[iden = "s_i_id"]
    SIId,
    #[iden = "s_w_id"]
    SWId,
    #[iden = "s_quantity"]
    SQuantity,
    #[iden = "s_dist_01"]
    SDist01,
    #[iden = "s_dist_02"]
    SDist02,
    #[iden = "s_dist_03"]
    SDist03,
    #[iden = "s_dist_04"]
    SDist04,
    #[iden = "s_dist_05"]
    SDist05,
    #[iden = "s_dist_06"]
    SDist06,
    #[iden = "s_dist_07"]
    SDist07,
    #[iden = "s_dist_08"]
    SDist08,
    #[iden = "s_dist_09"]
    SDist09,
    #[iden = "s_dist_10"]
    SDist10,
    #[iden = "s_ytd"]
    SYtd,
    #[iden = "s_order_cnt"]
    SOrderCnt,
    #[iden = "s_remote_cnt"]
    SRemoteCnt,
    #[iden = "s_data"]
    SData,
}

impl Stock {
    pub const COLUMNS: [Stock; 17] = [
        Stock::SIId,
        Stock::SWId,
        Stock::SQuantity,
        Stock::SDist01,
        Stock::SDist02,
        Stock::SDist03,
        Stock::SDist04,
        Stock::SDist05,
        Stock::SDist06,
        Stock::SDist07,
        Stock::SDist08,
        Stock::SDist09,
        Stock::SDist10,
        Stock::SYtd,
        Stock::SOrderCnt,
        Stock::SRemoteCnt,
        Stock::SData,
    ];
}

/// Table DDL shared by SQLite and PostgreSQL.
///
/// Timestamps are RFC 3339 text and booleans are 0/1 integers so that both
/// dialects decode the same column types.
pub const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS warehouse (
    w_id INTEGER NOT NULL,
    w_name TEXT NOT NULL,
    w_street_1 TEXT NOT NULL,
    w_street_2 TEXT NOT NULL,
    w_city TEXT NOT NULL,
    w_state TEXT NOT NULL,
    w_zip TEXT NOT NULL,
    w_tax DOUBLE PRECISION NOT NULL,
    w_ytd DOUBLE PRECISION NOT NULL,
    PRIMARY KEY (w_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS district (
    d_id INTEGER NOT NULL,
    d_w_id INTEGER NOT NULL,
    d_name TEXT NOT NULL,
    d_street_1 TEXT NOT NULL,
    d_street_2 TEXT NOT NULL,
    d_city TEXT NOT NULL,
    d_state TEXT NOT NULL,
    d_zip TEXT NOT NULL,
    d_tax DOUBLE PRECISION NOT NULL,
    d_ytd DOUBLE PRECISION NOT NULL,
    d_next_o_id INTEGER NOT NULL,
    PRIMARY KEY (d_w_id, d_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS customer (
    c_id INTEGER NOT NULL,
    c_d_id INTEGER NOT NULL,
    c_w_id INTEGER NOT NULL,
    c_first TEXT NOT NULL,
    c_middle TEXT NOT NULL,
    c_last TEXT NOT NULL,
    c_street_1 TEXT NOT NULL,
    c_street_2 TEXT NOT NULL,
    c_city TEXT NOT NULL,
    c_state TEXT NOT NULL,
    c_zip TEXT NOT NULL,
    c_phone TEXT NOT NULL,
    c_since TEXT NOT NULL,
    c_credit TEXT NOT NULL,
    c_credit_lim DOUBLE PRECISION NOT NULL,
    c_discount DOUBLE PRECISION NOT NULL,
    c_balance DOUBLE PRECISION NOT NULL,
    c_ytd_payment DOUBLE PRECISION NOT NULL,
    c_payment_cnt INTEGER NOT NULL,
    c_delivery_cnt INTEGER NOT NULL,
    c_data TEXT NOT NULL,
    PRIMARY KEY (c_w_id, c_d_id, c_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS history (
    h_c_id INTEGER NOT NULL,
    h_c_d_id INTEGER NOT NULL,
    h_c_w_id INTEGER NOT NULL,
    h_d_id INTEGER NOT NULL,
    h_w_id INTEGER NOT NULL,
    h_date TEXT NOT NULL,
    h_amount DOUBLE PRECISION NOT NULL,
    h_data TEXT NOT NULL
)"#,
    r#"CREATE TABLE IF NOT EXISTS new_order (
    no_o_id INTEGER NOT NULL,
    no_d_id INTEGER NOT NULL,
    no_w_id INTEGER NOT NULL,
    PRIMARY KEY (no_w_id, no_d_id, no_o_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
    o_id INTEGER NOT NULL,
    o_d_id INTEGER NOT NULL,
    o_w_id INTEGER NOT NULL,
    o_c_id INTEGER NOT NULL,
    o_entry_d TEXT NOT NULL,
    o_carrier_id INTEGER,
    o_ol_cnt INTEGER NOT NULL,
    o_all_local INTEGER NOT NULL,
    PRIMARY KEY (o_w_id, o_d_id, o_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS order_line (
    ol_o_id INTEGER NOT NULL,
    ol_d_id INTEGER NOT NULL,
    ol_w_id INTEGER NOT NULL,
    ol_number INTEGER NOT NULL,
    ol_i_id INTEGER NOT NULL,
    ol_supply_w_id INTEGER NOT NULL,
    ol_delivery_d TEXT,
    ol_quantity INTEGER NOT NULL,
    ol_amount DOUBLE PRECISION NOT NULL,
    ol_dist_info TEXT NOT NULL,
    PRIMARY KEY (ol_w_id, ol_d_id, ol_o_id, ol_number)
)"#,
    r#"CREATE TABLE IF NOT EXISTS item (
    i_id INTEGER NOT NULL,
    i_im_id INTEGER NOT NULL,
    i_name TEXT NOT NULL,
    i_price DOUBLE PRECISION NOT NULL,
    i_data TEXT NOT NULL,
    PRIMARY KEY (i_id)
)"#,
    r#"CREATE TABLE IF NOT EXISTS stock (
    s_i_id INTEGER NOT NULL,
    s_w_id INTEGER NOT NULL,
    s_quantity INTEGER NOT NULL,
    s_dist_01 TEXT NOT NULL,
    s_dist_02 TEXT NOT NULL,
    s_dist_03 TEXT NOT NULL,
    s_dist_04 TEXT NOT NULL,
    s_dist_05 TEXT NOT NULL,
    s_dist_06 TEXT NOT NULL,
    s_dist_07 TEXT NOT NULL,
    s_dist_08 TEXT NOT NULL,
    s_dist_09 TEXT NOT NULL,
    s_dist_10 TEXT NOT NULL,
    s_ytd INTEGER NOT NULL,
    s_order_cnt INTEGER NOT NULL,
    s_remote_cnt INTEGER NOT NULL,
    s_data TEXT NOT NULL,
    PRIMARY KEY (s_w_id, s_i_id)
)"#,
];

/// Secondary indexes for the by-name and last-order lookups.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_customer_name ON customer (c_w_id, c_d_id, c_last, c_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders (o_w_id, o_d_id, o_c_id, o_id)",
];
