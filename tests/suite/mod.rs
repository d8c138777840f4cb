mod provider;
mod trim;
