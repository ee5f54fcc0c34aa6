mod delete;
mod dispatch;
