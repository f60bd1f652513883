pub mod ordersystem;
